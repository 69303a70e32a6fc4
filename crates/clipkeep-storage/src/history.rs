//! JSON-file backed clipboard history.
//!
//! The whole collection is read into memory on first access and rewritten in
//! full after every mutation that changes it. All access goes through one
//! mutex, so a capture tick and a boundary call can never interleave their
//! load/mutate/persist cycles.
//!
//! Persist failures are soft: the in-memory collection keeps the mutation,
//! the store is flagged dirty, and the next successful write catches the file
//! up. Load failures fall back to an empty collection.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use clipkeep_core::error::{ClipkeepError, Result};
use clipkeep_core::types::{Entry, EntryContent, EntryId, EntryKind};

/// History store shared between the capture loop and the boundary.
pub type SharedHistory = Arc<HistoryStore>;

/// Durable, ordered collection of clipboard entries.
pub struct HistoryStore {
    path: PathBuf,
    state: Mutex<HistoryState>,
}

#[derive(Default)]
struct HistoryState {
    /// `None` until the first access loads the file.
    entries: Option<Vec<Entry>>,
    last_id: EntryId,
    /// Set when memory is ahead of the file.
    dirty: bool,
}

impl HistoryStore {
    /// Open the history at `path`, creating the parent directory and an empty
    /// history file if none exists yet. Entries are loaded lazily.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            fs::write(&path, b"[]")?;
            info!(path = %path.display(), "Created empty history file");
        }

        Ok(Self {
            path,
            state: Mutex::new(HistoryState::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a new, non-favorite entry at the front of the history.
    ///
    /// The id is the current time in milliseconds, bumped past the previous
    /// id when the clock has not moved on.
    pub fn add(&self, content: EntryContent) -> EntryId {
        self.mutate(|state, entries| {
            let id = Utc::now().timestamp_millis().max(state.last_id + 1);
            state.last_id = id;
            let entry = Entry::new(id, content);
            debug!(id, kind = entry.kind().as_str(), "Adding history entry");
            entries.insert(0, entry);
            (id, true)
        })
    }

    /// Entries in default order (favorites first, then newest first), sliced
    /// to `[offset, offset + limit)`.
    pub fn list(&self, limit: usize, offset: usize) -> Vec<Entry> {
        self.read(|entries| {
            let mut sorted = entries.to_vec();
            sorted.sort_by(default_order);
            sorted.into_iter().skip(offset).take(limit).collect()
        })
    }

    /// Text entries whose content contains `query`, ignoring case, newest
    /// first. Favorites get no priority here.
    pub fn search(&self, query: &str) -> Vec<Entry> {
        let needle = query.to_lowercase();
        self.read(|entries| {
            let mut hits: Vec<Entry> = entries
                .iter()
                .filter(|e| e.kind() == EntryKind::Text)
                .filter(|e| e.content().to_lowercase().contains(&needle))
                .cloned()
                .collect();
            hits.sort_by(newest_first);
            hits
        })
    }

    /// Look up a single entry.
    pub fn get(&self, id: EntryId) -> Option<Entry> {
        self.read(|entries| entries.iter().find(|e| e.id == id).cloned())
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn delete(&self, id: EntryId) -> bool {
        self.mutate(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            let removed = entries.len() != before;
            (removed, removed)
        })
    }

    /// Flip the favorite flag of `id`. Returns the new value, or `None` when
    /// the entry does not exist.
    pub fn toggle_favorite(&self, id: EntryId) -> Option<bool> {
        self.mutate(|_, entries| match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.is_favorite = !entry.is_favorite;
                (Some(entry.is_favorite), true)
            }
            None => (None, false),
        })
    }

    /// Drop every non-favorite entry. Returns the number removed.
    pub fn clear_non_favorites(&self) -> usize {
        self.mutate(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.is_favorite);
            let removed = before - entries.len();
            (removed, removed > 0)
        })
    }

    /// Keep every favorite and at most `limit` of the newest non-favorites.
    /// Returns the number of entries discarded.
    pub fn prune(&self, limit: usize) -> usize {
        self.mutate(|_, entries| {
            let non_favorites = entries.iter().filter(|e| !e.is_favorite).count();
            if non_favorites <= limit {
                return (0, false);
            }

            let (favorites, mut others): (Vec<Entry>, Vec<Entry>) =
                entries.drain(..).partition(|e| e.is_favorite);
            others.sort_by(newest_first);
            let removed = others.len() - limit;
            others.truncate(limit);

            *entries = favorites;
            entries.extend(others);
            debug!(removed, limit, "Pruned history");
            (removed, true)
        })
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the in-memory collection holds changes the file does not.
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Rewrite the file if a previous persist failed.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.lock();
        if !state.dirty {
            return Ok(());
        }
        let entries = state.entries.as_deref().unwrap_or_default();
        write_entries(&self.path, entries)?;
        state.dirty = false;
        info!(path = %self.path.display(), "History flushed");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        // A panic while holding the lock cannot leave a half-applied
        // mutation: every closure below mutates a Vec it fully owns.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read<T>(&self, f: impl FnOnce(&[Entry]) -> T) -> T {
        let mut state = self.lock();
        let entries = self.ensure_loaded(&mut *state);
        f(entries)
    }

    /// Run one load/mutate/persist cycle under the lock. The closure returns
    /// its result and whether it changed the collection.
    fn mutate<T>(&self, f: impl FnOnce(&mut HistoryState, &mut Vec<Entry>) -> (T, bool)) -> T {
        let mut state = self.lock();
        self.ensure_loaded(&mut *state);

        let mut entries = state.entries.take().unwrap_or_default();
        let (result, changed) = f(&mut *state, &mut entries);

        if changed || state.dirty {
            match write_entries(&self.path, &entries) {
                Ok(()) => state.dirty = false,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to persist history, keeping in-memory copy");
                    state.dirty = true;
                }
            }
        }

        state.entries = Some(entries);
        result
    }

    fn ensure_loaded<'a>(&self, state: &'a mut HistoryState) -> &'a mut Vec<Entry> {
        if state.entries.is_none() {
            let entries = match read_entries(&self.path) {
                Ok(entries) => {
                    info!(path = %self.path.display(), count = entries.len(), "History loaded");
                    entries
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to load history, starting empty");
                    Vec::new()
                }
            };
            state.last_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
            state.entries = Some(entries);
        }
        state.entries.get_or_insert_with(Vec::new)
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("path", &self.path)
            .finish()
    }
}

/// Favorites first, then most recently created first.
fn default_order(a: &Entry, b: &Entry) -> Ordering {
    b.is_favorite
        .cmp(&a.is_favorite)
        .then_with(|| newest_first(a, b))
}

fn newest_first(a: &Entry, b: &Entry) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

fn read_entries(path: &Path) -> Result<Vec<Entry>> {
    let bytes = fs::read(path).map_err(|e| ClipkeepError::Load(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ClipkeepError::Load(e.to_string()))
}

/// Write the full collection to a sibling temp file, then rename it over the
/// history file so readers only ever see a complete document.
fn write_entries(path: &Path, entries: &[Entry]) -> Result<()> {
    let json = serde_json::to_vec(entries)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).map_err(|e| {
        ClipkeepError::Persist(format!("write {} failed: {}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        ClipkeepError::Persist(format!(
            "rename {} -> {} failed: {}",
            tmp_path.display(),
            path.display(),
            e
        ))
    })?;
    Ok(())
}
