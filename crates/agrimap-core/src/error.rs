//! Error types for the AgriMap analysis pipeline.

use thiserror::Error;

/// Result type alias using agrimap's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for agrimap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (bad upload, malformed parameters)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Analysis backend failed
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Persistence layer failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("image file is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: image file is empty");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("analysis result".to_string());
        assert_eq!(err.to_string(), "Not found: analysis result");
    }

    #[test]
    fn test_error_display_analysis() {
        let err = Error::Analysis("model timeout".to_string());
        assert_eq!(err.to_string(), "Analysis error: model timeout");
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("connection refused".to_string());
        assert_eq!(err.to_string(), "Storage error: connection refused");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
