pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{ClipkeepConfig, SharedConfig};
pub use error::{ClipkeepError, Result};
pub use events::HistoryEvent;
pub use types::*;
