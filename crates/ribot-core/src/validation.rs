//! # Validation Module
//!
//! Input validation for requests built on the device before they reach the
//! ribot API or the beacon table.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request constructors (THIS MODULE)                           │
//! │  ├── CheckInRequest::from_venue / from_label                           │
//! │  └── Beacon triple from scanning hardware                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: SQLite                                                       │
//! │  └── UNIQUE(uuid, major, minor) on registered_beacons                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: ribot API                                                    │
//! │  └── 4xx responses surfaced as network errors                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ribot_core::validation::{validate_beacon_uuid, validate_label};
//!
//! validate_label("Brighton office").unwrap();
//! validate_beacon_uuid("f7826da6-4fa2-4e98-8024-bc5b71e0893e").unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LABEL_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a server-side identifier (venue id, check-in id, beacon id).
///
/// ## Rules
/// - Must not be empty or whitespace
/// - Must not contain `/` (identifiers are interpolated into URL paths)
///
/// ## Example
/// ```rust
/// use ribot_core::validation::validate_id;
///
/// assert!(validate_id("check_in_id", "c1").is_ok());
/// assert!(validate_id("check_in_id", "").is_err());
/// assert!(validate_id("check_in_id", "a/b").is_err());
/// ```
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.contains('/') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain '/'".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text check-in label.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most [`MAX_LABEL_LENGTH`] characters
pub fn validate_label(label: &str) -> ValidationResult<()> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::Required {
            field: "label".to_string(),
        });
    }

    if label.chars().count() > MAX_LABEL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "label".to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Beacon Validators
// =============================================================================

/// Validates a beacon proximity UUID as reported by scanning hardware.
///
/// ## Rules
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
/// - Hex digits in either case
///
/// ## Example
/// ```rust
/// use ribot_core::validation::validate_beacon_uuid;
///
/// assert!(validate_beacon_uuid("F7826DA6-4FA2-4E98-8024-BC5B71E0893E").is_ok());
/// assert!(validate_beacon_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_beacon_uuid(uuid: &str) -> ValidationResult<()> {
    if uuid.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "uuid".to_string(),
        });
    }

    let well_formed = uuid.len() == 36
        && uuid.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        });

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "uuid".to_string(),
            reason: "must be a 36 character hyphenated UUID".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("id", "c1").is_ok());
        assert!(validate_id("id", "5644e0c4-1c2e").is_ok());

        assert!(validate_id("id", "").is_err());
        assert!(validate_id("id", "  ").is_err());
        assert!(validate_id("id", "../venues").is_err());
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("Home").is_ok());
        assert!(validate_label(&"a".repeat(MAX_LABEL_LENGTH)).is_ok());

        assert!(validate_label("").is_err());
        assert!(validate_label(&"a".repeat(MAX_LABEL_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_beacon_uuid() {
        assert!(validate_beacon_uuid("f7826da6-4fa2-4e98-8024-bc5b71e0893e").is_ok());
        assert!(validate_beacon_uuid("").is_err());
        assert!(validate_beacon_uuid("f7826da64fa24e988024bc5b71e0893e").is_err());
        assert!(validate_beacon_uuid("g7826da6-4fa2-4e98-8024-bc5b71e0893e").is_err());
    }
}
