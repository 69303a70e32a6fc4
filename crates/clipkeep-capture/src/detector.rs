//! Clipboard change detection by value comparison.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Change detector shared between the capture loop and paste.
pub type SharedDetector = Arc<Mutex<ChangeDetector>>;

/// Result of comparing one clipboard sample with the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    pub text_changed: bool,
    pub image_changed: bool,
}

impl Observation {
    pub fn any(&self) -> bool {
        self.text_changed || self.image_changed
    }
}

/// Remembers the last text and image signature seen on the clipboard.
///
/// Two different images that encode to the same signature are treated as the
/// same image.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_text: Option<String>,
    last_image_signature: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedDetector {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Compare a sample against the remembered values and remember whatever
    /// changed.
    ///
    /// Whitespace-only text is never a change and is not remembered. A missing
    /// text or image leaves the remembered value untouched, so content that
    /// comes back after an empty sample is not recorded twice.
    pub fn observe(&mut self, text: Option<&str>, image_signature: Option<&str>) -> Observation {
        let text_changed = match text {
            Some(text) if !text.trim().is_empty() => {
                self.last_text.as_deref() != Some(text)
            }
            _ => false,
        };
        if text_changed {
            self.remember_text(text.unwrap_or_default());
        }

        let image_changed = match image_signature {
            Some(sig) => self.last_image_signature.as_deref() != Some(sig),
            None => false,
        };
        if image_changed {
            self.remember_image(image_signature.unwrap_or_default());
        }

        if text_changed || image_changed {
            debug!(text_changed, image_changed, "Clipboard change detected");
        }

        Observation {
            text_changed,
            image_changed,
        }
    }

    /// Record text written by the application so the next sample of it is
    /// not captured.
    pub fn remember_text(&mut self, text: &str) {
        self.last_text = Some(text.to_string());
    }

    /// Record an image signature written by the application.
    pub fn remember_image(&mut self, signature: &str) {
        self.last_image_signature = Some(signature.to_string());
    }

    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    pub fn last_image_signature(&self) -> Option<&str> {
        self.last_image_signature.as_deref()
    }
}
