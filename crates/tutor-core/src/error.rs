use thiserror::Error;

/// Top-level error type for the tutor workspace.
///
/// Subsystem crates define their own error types and convert into or out of
/// `TutorError` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TutorError {
    fn from(err: toml::de::Error) -> Self {
        TutorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TutorError {
    fn from(err: toml::ser::Error) -> Self {
        TutorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        TutorError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;
