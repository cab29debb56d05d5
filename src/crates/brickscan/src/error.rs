//! Error types for recognition and price enrichment.

use thiserror::Error;

/// Result type for brickscan operations.
pub type Result<T> = std::result::Result<T, BrickscanError>;

/// Errors that can occur while scanning an image.
#[derive(Debug, Error)]
pub enum BrickscanError {
    /// Recognition failed on every configured endpoint.
    #[error("Recognition failed: {0}")]
    RecognitionFailure(String),

    /// A single price lookup failed.
    #[error("Price lookup failed for {id}: {reason}")]
    PriceLookupFailure { id: String, reason: String },

    /// A newer submit replaced this operation before it finished.
    #[error("Superseded by a newer scan (generation {generation})")]
    Superseded { generation: u64 },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected schema.
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrickscanError {
    /// Check if this error should be shown to the user as a failed scan.
    pub fn is_recognition_failure(&self) -> bool {
        matches!(self, BrickscanError::RecognitionFailure(_))
    }

    /// Check if this error came from a stale operation.
    pub fn is_superseded(&self) -> bool {
        matches!(self, BrickscanError::Superseded { .. })
    }
}

impl From<serde_json::Error> for BrickscanError {
    fn from(err: serde_json::Error) -> Self {
        BrickscanError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrickscanError::PriceLookupFailure {
            id: "sw0001".to_string(),
            reason: "status 404".to_string(),
        };
        assert_eq!(err.to_string(), "Price lookup failed for sw0001: status 404");

        let err = BrickscanError::Superseded { generation: 3 };
        assert!(err.is_superseded());
        assert!(!err.is_recognition_failure());
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err: BrickscanError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, BrickscanError::Decode(_)));
    }
}
