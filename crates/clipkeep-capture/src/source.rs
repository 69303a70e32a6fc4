//! Clipboard access behind a trait, with a system backend and a mock.

use std::borrow::Cow;
use std::sync::Mutex;

use tracing::debug;

use clipkeep_core::error::{ClipkeepError, Result};

/// Raw clipboard image: RGBA8 pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl ClipImage {
    pub fn new(width: usize, height: usize, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
        }
    }
}

/// Read and write access to the system clipboard.
///
/// Reads return `Ok(None)` when the clipboard holds no content of that kind;
/// errors are reserved for the clipboard being unreachable.
pub trait ClipboardSource: Send + Sync {
    fn read_text(&self) -> Result<Option<String>>;

    fn read_image(&self) -> Result<Option<ClipImage>>;

    fn write_text(&self, text: &str) -> Result<()>;

    fn write_image(&self, image: &ClipImage) -> Result<()>;
}

/// System clipboard via `arboard`.
pub struct ArboardClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| ClipkeepError::Clipboard(format!("Failed to open clipboard: {}", e)))?;
        Ok(Self {
            inner: Mutex::new(clipboard),
        })
    }

    fn with_clipboard<T>(
        &self,
        f: impl FnOnce(&mut arboard::Clipboard) -> std::result::Result<T, arboard::Error>,
    ) -> std::result::Result<T, arboard::Error> {
        let mut clipboard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut clipboard)
    }
}

impl std::fmt::Debug for ArboardClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArboardClipboard").finish_non_exhaustive()
    }
}

fn absent_as_none<T>(result: std::result::Result<T, arboard::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(arboard::Error::ContentNotAvailable) => Ok(None),
        Err(e) => Err(ClipkeepError::Clipboard(e.to_string())),
    }
}

impl ClipboardSource for ArboardClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        absent_as_none(self.with_clipboard(|c| c.get_text()))
    }

    fn read_image(&self) -> Result<Option<ClipImage>> {
        let image = absent_as_none(self.with_clipboard(|c| c.get_image()))?;
        Ok(image.map(|data| ClipImage::new(data.width, data.height, data.bytes.into_owned())))
    }

    fn write_text(&self, text: &str) -> Result<()> {
        self.with_clipboard(|c| c.set_text(text))
            .map_err(|e| ClipkeepError::Clipboard(format!("Failed to write text: {}", e)))?;
        debug!(len = text.len(), "Wrote text to clipboard");
        Ok(())
    }

    fn write_image(&self, image: &ClipImage) -> Result<()> {
        let data = arboard::ImageData {
            width: image.width,
            height: image.height,
            bytes: Cow::Borrowed(&image.rgba),
        };
        self.with_clipboard(|c| c.set_image(data))
            .map_err(|e| ClipkeepError::Clipboard(format!("Failed to write image: {}", e)))?;
        debug!(width = image.width, height = image.height, "Wrote image to clipboard");
        Ok(())
    }
}

/// In-memory clipboard for tests and headless runs.
///
/// Writes replace the current content just as the system clipboard would, so
/// a paste followed by a capture tick sees its own write.
#[derive(Debug, Default)]
pub struct MockClipboard {
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    text: Option<String>,
    image: Option<ClipImage>,
    unavailable: bool,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock holding `text`.
    pub fn with_text(text: &str) -> Self {
        let mock = Self::new();
        mock.set_text(text);
        mock
    }

    pub fn set_text(&self, text: &str) {
        self.state().text = Some(text.to_string());
    }

    pub fn set_image(&self, image: ClipImage) {
        self.state().image = Some(image);
    }

    /// Remove all content.
    pub fn clear(&self) {
        let mut state = self.state();
        state.text = None;
        state.image = None;
    }

    /// Make every read and write fail, as an unreachable clipboard would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn text(&self) -> Option<String> {
        self.state().text.clone()
    }

    pub fn image(&self) -> Option<ClipImage> {
        self.state().image.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(state: &MockState) -> Result<()> {
        if state.unavailable {
            Err(ClipkeepError::Clipboard("mock clipboard unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl ClipboardSource for MockClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.text.clone())
    }

    fn read_image(&self) -> Result<Option<ClipImage>> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.image.clone())
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        Self::check_available(&state)?;
        state.text = Some(text.to_string());
        Ok(())
    }

    fn write_image(&self, image: &ClipImage) -> Result<()> {
        let mut state = self.state();
        Self::check_available(&state)?;
        state.image = Some(image.clone());
        Ok(())
    }
}
