//! # Error Types
//!
//! Domain-specific error types for ribot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ribot-core errors (this file)                                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ribot-db errors (separate crate)                                      │
//! │  └── DbError          - Beacon table failures                          │
//! │                                                                         │
//! │  ribot-sync errors (separate crate)                                    │
//! │  ├── ApiError         - HTTP failures from the ribot API               │
//! │  └── SyncError        - What DataManager callers see                   │
//! │                                                                         │
//! │  Flow: ValidationError / DbError / ApiError → SyncError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by request constructors before anything touches the network or
/// the local stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., malformed beacon UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "venue_id".to_string(),
        };
        assert_eq!(err.to_string(), "venue_id is required");

        let err = ValidationError::TooLong {
            field: "label".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "label must be at most 100 characters");
    }
}
