use thiserror::Error;

/// Top-level error type for the voxquery system.
///
/// Subsystem crates define their own error types and implement
/// `From<VoxQueryError>` or `From<SubsystemError> for VoxQueryError` so that
/// `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoxQueryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VoxQueryError {
    fn from(err: toml::de::Error) -> Self {
        VoxQueryError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VoxQueryError {
    fn from(err: toml::ser::Error) -> Self {
        VoxQueryError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoxQueryError {
    fn from(err: serde_json::Error) -> Self {
        VoxQueryError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for voxquery operations.
pub type Result<T> = std::result::Result<T, VoxQueryError>;
