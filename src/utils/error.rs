//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model and training code.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the eye disease classifier
#[derive(Error, Debug)]
pub enum EyeDiseaseError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoadError(PathBuf, String),

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model persistence or shape checks
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl EyeDiseaseError {
    /// Whether this error means a file or directory was missing
    pub fn is_not_found(&self) -> bool {
        match self {
            EyeDiseaseError::PathNotFound(_) => true,
            EyeDiseaseError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience Result type for the eye disease classifier
pub type Result<T> = std::result::Result<T, EyeDiseaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EyeDiseaseError::Dataset("test error".to_string());
        assert_eq!(format!("{}", err), "Dataset error: test error");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/eye.jpg");
        let err = EyeDiseaseError::ImageLoadError(path, "unsupported format".to_string());
        assert!(format!("{}", err).contains("eye.jpg"));
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(EyeDiseaseError::PathNotFound(PathBuf::from("dataset")).is_not_found());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(EyeDiseaseError::from(io).is_not_found());

        assert!(!EyeDiseaseError::Config("bad ratio".to_string()).is_not_found());
    }
}
