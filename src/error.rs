//! kfseq error types

use thiserror::Error;

/// kfseq error type
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or malformed keyframe payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown or expired artifact
    #[error("Not found: {0}")]
    NotFound(String),

    /// Encoder reached a state validated input cannot produce
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    /// Artifact backing bytes could not be written, read or freed
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// External publisher rejected or failed the upload
    #[error("Publish error: {0}")]
    Publish(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller caused this error and can fix the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

/// Result type alias for kfseq operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert!(Error::InvalidInput("x".into())
            .to_string()
            .starts_with("Invalid input:"));
        assert!(Error::NotFound("x".into())
            .to_string()
            .starts_with("Not found:"));
        assert!(Error::StorageFailure("disk".into())
            .to_string()
            .contains("disk"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("empty".into()).is_client_error());
        assert!(Error::NotFound("gone".into()).is_client_error());
        assert!(!Error::EncodingFailure("len".into()).is_client_error());
        assert!(!Error::StorageFailure("io".into()).is_client_error());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
