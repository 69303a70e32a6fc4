//! Clipkeep capture crate - clipboard sampling, change detection, capture loop.
//!
//! Provides the ClipboardSource trait with an arboard-backed implementation
//! and an in-memory mock, PNG/data-URL encoding for clipboard images, the
//! value-comparing ChangeDetector, the CaptureSession lifecycle and the
//! fixed-interval CaptureLoop that feeds the history store.

pub mod capture_loop;
pub mod detector;
pub mod png;
pub mod session;
pub mod source;

pub use capture_loop::{CaptureLoop, TickOutcome};
pub use detector::{ChangeDetector, Observation, SharedDetector};
pub use png::EncodedImage;
pub use session::{CaptureSession, SharedSession};
pub use source::{ArboardClipboard, ClipImage, ClipboardSource, MockClipboard};
