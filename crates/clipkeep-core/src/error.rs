use thiserror::Error;

/// Top-level error type for clipkeep.
///
/// Storage-side failures are split by phase (`Load`, `Persist`, `BlobWrite`)
/// because each one has a different recovery rule: a load failure falls back
/// to an empty history, a persist failure keeps the in-memory cache serving,
/// and a blob failure drops the capture that triggered it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClipkeepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("History load error: {0}")]
    Load(String),

    #[error("History persist error: {0}")]
    Persist(String),

    #[error("Blob write error: {0}")]
    BlobWrite(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Paste error: {0}")]
    Paste(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ClipkeepError {
    fn from(err: toml::de::Error) -> Self {
        ClipkeepError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClipkeepError {
    fn from(err: toml::ser::Error) -> Self {
        ClipkeepError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ClipkeepError {
    fn from(err: serde_json::Error) -> Self {
        ClipkeepError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for clipkeep operations.
pub type Result<T> = std::result::Result<T, ClipkeepError>;
