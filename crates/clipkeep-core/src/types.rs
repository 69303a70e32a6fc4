use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of characters kept in a text entry's preview.
pub const PREVIEW_CHARS: usize = 100;

/// Page size used when a caller does not supply a limit.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

// =============================================================================
// Identity
// =============================================================================

/// Entry identifier: the capture time in milliseconds since the Unix epoch.
///
/// The history store bumps the value past the previous id when two captures
/// land in the same millisecond, so ids are unique and strictly increasing.
pub type EntryId = i64;

// =============================================================================
// Enums
// =============================================================================

/// The kind of captured clipboard content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Text,
    Image,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Text => "text",
            EntryKind::Image => "image",
        }
    }
}

/// State of the clipboard capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    /// Sampling the clipboard every tick.
    Active,
    /// Ticks are skipped until resumed.
    Paused,
    /// The capture loop exits at its next tick.
    Stopped,
}

/// Payload of an entry, one variant per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryContent {
    /// Captured text plus its truncated preview.
    Text { text: String, preview: String },
    /// Reference into the blob directory plus an inline PNG data URL that a
    /// UI can render without touching the blob store.
    Image { blob: String, data_url: String },
}

impl EntryContent {
    /// Text content with a preview truncated to [`PREVIEW_CHARS`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_preview(text, PREVIEW_CHARS)
    }

    /// Text content with a preview of at most `preview_chars` characters,
    /// never more than [`PREVIEW_CHARS`].
    pub fn text_with_preview(text: impl Into<String>, preview_chars: usize) -> Self {
        let text = text.into();
        let preview = truncate_preview(&text, preview_chars.min(PREVIEW_CHARS));
        EntryContent::Text { text, preview }
    }

    /// Image content referencing a stored blob.
    pub fn image(blob: impl Into<String>, data_url: impl Into<String>) -> Self {
        EntryContent::Image {
            blob: blob.into(),
            data_url: data_url.into(),
        }
    }

    /// Rebuild content from the flat `(kind, content, preview)` triple used on
    /// disk and at the boundary.
    pub fn from_parts(kind: EntryKind, content: String, preview: String) -> Self {
        match kind {
            EntryKind::Text => EntryContent::Text {
                text: content,
                preview,
            },
            EntryKind::Image => EntryContent::Image {
                blob: content,
                data_url: preview,
            },
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            EntryContent::Text { .. } => EntryKind::Text,
            EntryContent::Image { .. } => EntryKind::Image,
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// One captured clipboard item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "EntryRecord", from = "EntryRecord")]
pub struct Entry {
    pub id: EntryId,
    pub content: EntryContent,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
}

impl Entry {
    /// Create a non-favorite entry whose `created_at` is derived from `id`.
    pub fn new(id: EntryId, content: EntryContent) -> Self {
        let created_at = DateTime::from_timestamp_millis(id).unwrap_or_else(Utc::now);
        Self {
            id,
            content,
            created_at,
            is_favorite: false,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.content.kind()
    }

    /// The captured text, or the blob reference for images.
    pub fn content(&self) -> &str {
        match &self.content {
            EntryContent::Text { text, .. } => text,
            EntryContent::Image { blob, .. } => blob,
        }
    }

    /// The text preview, or the inline data URL for images.
    pub fn preview(&self) -> &str {
        match &self.content {
            EntryContent::Text { preview, .. } => preview,
            EntryContent::Image { data_url, .. } => data_url,
        }
    }

    /// Path of the backing blob file, for image entries.
    pub fn blob_path(&self) -> Option<&Path> {
        match &self.content {
            EntryContent::Image { blob, .. } => Some(Path::new(blob)),
            EntryContent::Text { .. } => None,
        }
    }
}

/// Flat on-disk / on-wire shape of an [`Entry`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct EntryRecord {
    id: EntryId,
    #[serde(rename = "type")]
    kind: EntryKind,
    content: String,
    preview: String,
    created_at: DateTime<Utc>,
    #[serde(
        serialize_with = "serialize_flag",
        deserialize_with = "deserialize_flag",
        default
    )]
    is_favorite: bool,
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        let kind = entry.kind();
        let (content, preview) = match entry.content {
            EntryContent::Text { text, preview } => (text, preview),
            EntryContent::Image { blob, data_url } => (blob, data_url),
        };
        Self {
            id: entry.id,
            kind,
            content,
            preview,
            created_at: entry.created_at,
            is_favorite: entry.is_favorite,
        }
    }
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        Self {
            id: record.id,
            content: EntryContent::from_parts(record.kind, record.content, record.preview),
            created_at: record.created_at,
            is_favorite: record.is_favorite,
        }
    }
}

/// Favorites are stored as `0` / `1`.
fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

/// Accepts `0` / `1` as written by [`serialize_flag`], and plain booleans.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Int(n) => n != 0,
        Flag::Bool(b) => b,
    })
}

/// Take at most `max_chars` characters from the start of `text`.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
