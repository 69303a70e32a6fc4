//! The boundary between the capture engine and its callers.
//!
//! Every read and mutation a UI or the HTTP layer performs goes through
//! [`ClipboardService`]. Steady-state operations never fail: missing ids are
//! no-ops and storage trouble is logged by the history store. Only paste,
//! which touches the system clipboard, reports errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use clipkeep_capture::png::{self, EncodedImage};
use clipkeep_capture::session::{self, SharedSession};
use clipkeep_capture::{ClipboardSource, SharedDetector};
use clipkeep_core::config::{self, ClipkeepConfig, SharedConfig};
use clipkeep_core::error::Result;
use clipkeep_core::events::{EventReceiver, EventSender};
use clipkeep_core::types::{CaptureStatus, Entry, EntryContent, EntryId, DEFAULT_PAGE_LIMIT};
use clipkeep_storage::{BlobStore, SharedHistory};

use crate::paste::{ConfiguredInjector, PasteInjector};

/// Request/response and push interface over the clipboard history.
#[derive(Clone)]
pub struct ClipboardService {
    history: SharedHistory,
    blobs: BlobStore,
    source: Arc<dyn ClipboardSource>,
    detector: SharedDetector,
    session: SharedSession,
    events: EventSender,
    config: SharedConfig,
    config_path: Option<PathBuf>,
    injector: Arc<dyn PasteInjector>,
}

impl ClipboardService {
    /// Create the service over shared engine state. Paste injection follows
    /// the live `[paste]` configuration.
    pub fn new(
        history: SharedHistory,
        blobs: BlobStore,
        source: Arc<dyn ClipboardSource>,
        detector: SharedDetector,
        session: SharedSession,
        events: EventSender,
        config: SharedConfig,
    ) -> Self {
        let injector = Arc::new(ConfiguredInjector::new(Arc::clone(&config)));
        Self {
            history,
            blobs,
            source,
            detector,
            session,
            events,
            config,
            config_path: None,
            injector,
        }
    }

    /// Persist saved settings to `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replace the paste injector.
    pub fn with_injector(mut self, injector: Arc<dyn PasteInjector>) -> Self {
        self.injector = injector;
        self
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Entries in default order. Missing arguments default to 50 and 0.
    pub fn get_history(&self, limit: Option<usize>, offset: Option<usize>) -> Vec<Entry> {
        self.history
            .list(limit.unwrap_or(DEFAULT_PAGE_LIMIT), offset.unwrap_or(0))
    }

    /// Text entries containing `query`, ignoring case, newest first.
    pub fn search_history(&self, query: &str) -> Vec<Entry> {
        self.history.search(query)
    }

    pub fn get_item(&self, id: EntryId) -> Option<Entry> {
        self.history.get(id)
    }

    /// Delete an entry and return the refreshed first page.
    pub fn delete_item(&self, id: EntryId) -> Vec<Entry> {
        if !self.history.delete(id) {
            debug!(id, "Delete of unknown entry ignored");
        }
        self.first_page()
    }

    /// Flip an entry's favorite flag and return the refreshed first page.
    pub fn toggle_favorite(&self, id: EntryId) -> Vec<Entry> {
        match self.history.toggle_favorite(id) {
            Some(is_favorite) => debug!(id, is_favorite, "Favorite toggled"),
            None => debug!(id, "Favorite toggle of unknown entry ignored"),
        }
        self.first_page()
    }

    /// Remove every non-favorite and return the refreshed first page.
    pub fn clear_history(&self) -> Vec<Entry> {
        let removed = self.history.clear_non_favorites();
        info!(removed, "History cleared");
        self.first_page()
    }

    /// Subscribe to the pages pushed after each capture.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    fn first_page(&self) -> Vec<Entry> {
        self.get_history(None, None)
    }

    // -------------------------------------------------------------------------
    // Paste
    // -------------------------------------------------------------------------

    /// Put `entry` back on the clipboard, then trigger paste injection in the
    /// background.
    ///
    /// The clipboard write and the change detector update happen under the
    /// detector lock, which a capture tick also holds while it samples, so
    /// the capture loop never records the paste as a new entry. Injection
    /// failures are logged only.
    pub async fn paste_item(&self, entry: &Entry) -> Result<()> {
        match &entry.content {
            EntryContent::Text { text, .. } => {
                let mut detector = self.lock_detector();
                self.source.write_text(text)?;
                detector.remember_text(text);
            }
            EntryContent::Image { blob, .. } => {
                let bytes = self.blobs.read(Path::new(blob))?;
                let image = png::decode_png(&bytes)?;
                let encoded = EncodedImage::from_clip(&image)?;
                let mut detector = self.lock_detector();
                self.source.write_image(&image)?;
                detector.remember_image(encoded.signature());
            }
        }
        info!(id = entry.id, kind = entry.kind().as_str(), "Entry written to clipboard");

        let injector = Arc::clone(&self.injector);
        tokio::spawn(async move {
            if let Err(e) = injector.inject().await {
                warn!(error = %e, injector = %injector.describe(), "Paste injection failed");
            }
        });
        Ok(())
    }

    fn lock_detector(&self) -> std::sync::MutexGuard<'_, clipkeep_capture::ChangeDetector> {
        self.detector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    pub fn get_settings(&self) -> ClipkeepConfig {
        config::snapshot(&self.config)
    }

    /// Make `next` the live configuration and persist it when a config path
    /// is set. A failed write is logged; the live copy is still replaced.
    pub fn save_settings(&self, next: ClipkeepConfig) -> ClipkeepConfig {
        if let Some(path) = &self.config_path {
            if let Err(e) = next.save(path) {
                warn!(error = %e, path = %path.display(), "Failed to save settings to disk");
            }
        }
        config::replace(&self.config, next.clone());
        info!(max_items = next.history.max_items, "Settings updated");
        next
    }

    // -------------------------------------------------------------------------
    // Capture control
    // -------------------------------------------------------------------------

    pub fn capture_status(&self) -> serde_json::Value {
        session::lock(&self.session).summary()
    }

    pub fn pause_capture(&self) -> CaptureStatus {
        let mut session = session::lock(&self.session);
        session.pause();
        info!(status = ?session.status(), "Capture pause requested");
        session.status()
    }

    pub fn resume_capture(&self) -> CaptureStatus {
        let mut session = session::lock(&self.session);
        session.resume();
        info!(status = ?session.status(), "Capture resume requested");
        session.status()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
