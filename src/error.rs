//! Error types for the output cache
//!
//! Provides unified error handling using thiserror. Most of these never reach
//! a caller as an `Err`: reads degrade to a miss and writes degrade to a
//! rejected [`PutOutcome`](crate::models::PutOutcome).

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the output cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Namespace identifier is malformed (caller misuse)
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A dependency could not be read while capturing or checking freshness
    #[error("Validity check failed for '{resource}': {message}")]
    ValidityCheck { resource: String, message: String },

    /// A persisted record could not be written or read back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Entry is larger than the budget it would be stored under
    #[error("Entry of {size} bytes exceeds budget of {budget} bytes")]
    Capacity { size: u64, budget: u64 },

    /// Namespace is configured to never cache
    #[error("Namespace '{0}' does not cache results")]
    NeverCache(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    /// Builds a validity check error for a dependency resource.
    pub fn validity(resource: impl Into<String>, message: impl ToString) -> Self {
        Self::ValidityCheck {
            resource: resource.into(),
            message: message.to_string(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the output cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_error_message() {
        let err = CacheError::validity("file.txt", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Validity check failed for 'file.txt': No such file or directory"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_capacity_error_message() {
        let err = CacheError::Capacity {
            size: 2048,
            budget: 1024,
        };
        assert!(err.to_string().contains("2048"));
        assert!(err.to_string().contains("1024"));
    }
}
