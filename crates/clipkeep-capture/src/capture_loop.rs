//! Fixed-interval clipboard capture.
//!
//! Each tick samples the clipboard, asks the change detector what is new,
//! records new text and images in the history, prunes it to the configured
//! size and pushes the refreshed first page to subscribers. A single task
//! drives the ticks, so two ticks never run at once; ticks that fall behind
//! are skipped rather than queued.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use clipkeep_core::config::{self, ClipkeepConfig, SharedConfig};
use clipkeep_core::events::{EventSender, HistoryEvent};
use clipkeep_core::types::{EntryContent, EntryId, EntryKind};
use clipkeep_storage::{BlobStore, SharedHistory};

use crate::detector::SharedDetector;
use crate::png::EncodedImage;
use crate::session::{self, SharedSession};
use crate::source::ClipboardSource;

/// What a single tick recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub text: Option<EntryId>,
    pub image: Option<EntryId>,
    pub pruned: usize,
}

impl TickOutcome {
    pub fn captured(&self) -> u64 {
        u64::from(self.text.is_some()) + u64::from(self.image.is_some())
    }
}

/// Everything one capture tick touches. Cloning shares the same stores.
#[derive(Clone)]
pub struct CaptureLoop {
    history: SharedHistory,
    blobs: BlobStore,
    source: Arc<dyn ClipboardSource>,
    detector: SharedDetector,
    session: SharedSession,
    events: EventSender,
    config: SharedConfig,
}

impl CaptureLoop {
    pub fn new(
        history: SharedHistory,
        blobs: BlobStore,
        source: Arc<dyn ClipboardSource>,
        detector: SharedDetector,
        session: SharedSession,
        events: EventSender,
        config: SharedConfig,
    ) -> Self {
        Self {
            history,
            blobs,
            source,
            detector,
            session,
            events,
            config,
        }
    }

    /// Sample the clipboard once and record whatever changed.
    ///
    /// Failures are logged and never stop the loop: an unreadable clipboard
    /// counts as empty, and an image whose blob cannot be written is dropped.
    pub fn tick(&self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        {
            let mut session = session::lock(&self.session);
            if !session.is_active() {
                return outcome;
            }
            session.record_tick();
        }

        let config = config::snapshot(&self.config);

        // Sample and observe under the detector lock; paste writes the
        // clipboard under the same lock.
        let (text, image, observation) = {
            let mut detector = self
                .detector
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let text = match self.source.read_text() {
                Ok(text) => text,
                Err(e) => {
                    debug!(error = %e, "Clipboard text unavailable");
                    None
                }
            };
            let image = if config.capture.capture_images {
                self.sample_image()
            } else {
                None
            };
            let observation =
                detector.observe(text.as_deref(), image.as_ref().map(EncodedImage::signature));
            (text, image, observation)
        };
        if !observation.any() {
            return outcome;
        }

        if observation.text_changed {
            if let Some(text) = text {
                let content = EntryContent::text_with_preview(text, config.capture.preview_chars);
                let id = self.history.add(content);
                outcome.text = Some(id);
                self.emit(HistoryEvent::Captured {
                    id,
                    kind: EntryKind::Text,
                });
            }
        }

        if observation.image_changed {
            if let Some(image) = image {
                outcome.image = self.record_image(image);
            }
        }

        self.finish_capture(&config, &mut outcome);
        session::lock(&self.session).record_captures(outcome.captured());
        outcome
    }

    /// Drive [`CaptureLoop::tick`] at the configured interval until the session
    /// is stopped.
    pub async fn run(self) {
        let period = config::snapshot(&self.config).capture.interval();
        info!(interval_ms = period.as_millis() as u64, "Clipboard capture loop started");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if session::lock(&self.session).is_stopped() {
                info!("Clipboard capture loop stopping");
                break;
            }

            // Clipboard and file I/O block; keep them off the async workers.
            let this = self.clone();
            match tokio::task::spawn_blocking(move || this.tick()).await {
                Ok(outcome) if outcome.captured() > 0 => {
                    debug!(
                        text = ?outcome.text,
                        image = ?outcome.image,
                        pruned = outcome.pruned,
                        "Clipboard capture recorded"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Capture tick failed"),
            }
        }
    }

    /// Run the loop as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn sample_image(&self) -> Option<EncodedImage> {
        let clip = match self.source.read_image() {
            Ok(Some(clip)) => clip,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "Clipboard image unavailable");
                return None;
            }
        };
        match EncodedImage::from_clip(&clip) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                warn!(error = %e, width = clip.width, height = clip.height, "Failed to encode clipboard image");
                None
            }
        }
    }

    fn record_image(&self, image: EncodedImage) -> Option<EntryId> {
        let path = match self.blobs.put(&image.png) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Failed to store clipboard image, skipping capture");
                return None;
            }
        };
        let content = EntryContent::image(path.to_string_lossy().into_owned(), image.data_url);
        let id = self.history.add(content);
        self.emit(HistoryEvent::Captured {
            id,
            kind: EntryKind::Image,
        });
        Some(id)
    }

    /// Prune and notify after a change was observed.
    fn finish_capture(&self, config: &ClipkeepConfig, outcome: &mut TickOutcome) {
        outcome.pruned = self.history.prune(config.history.max_items);
        if outcome.pruned > 0 {
            self.emit(HistoryEvent::Pruned {
                removed: outcome.pruned,
            });
        }
        let entries = self.history.list(config.history.page_size, 0);
        self.emit(HistoryEvent::Updated { entries });
    }

    fn emit(&self, event: HistoryEvent) {
        // No subscribers is not an error for the loop.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("history", &self.history)
            .field("blobs", &self.blobs)
            .finish_non_exhaustive()
    }
}
