//! clipkeep storage crate - durable clipboard history and image blobs.
//!
//! The history lives in a single JSON file that is loaded into memory on
//! first access and fully rewritten on every mutation. Captured images are
//! written as individual PNG files under a blob directory and referenced from
//! history entries by path.

pub mod blob;
pub mod history;

pub use blob::BlobStore;
pub use history::{HistoryStore, SharedHistory};
