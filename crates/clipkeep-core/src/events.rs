use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{Entry, EntryId, EntryKind};

/// Capacity of the broadcast channel that fans history events out to
/// subscribers. Slow subscribers lag and skip events rather than block the
/// capture loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events pushed from the capture engine to boundary consumers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum HistoryEvent {
    /// The history changed after a capture; carries the refreshed default page.
    Updated { entries: Vec<Entry> },

    /// A new entry was recorded by the capture loop.
    Captured { id: EntryId, kind: EntryKind },

    /// Retention pruning removed entries after a capture.
    Pruned { removed: usize },
}

impl HistoryEvent {
    /// Name used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            HistoryEvent::Updated { .. } => "update",
            HistoryEvent::Captured { .. } => "captured",
            HistoryEvent::Pruned { .. } => "pruned",
        }
    }
}

pub type EventSender = broadcast::Sender<HistoryEvent>;
pub type EventReceiver = broadcast::Receiver<HistoryEvent>;

/// Create the broadcast channel shared by the capture loop and the boundary.
pub fn event_channel() -> EventSender {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    tx
}
