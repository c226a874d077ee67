//! # Sync Error Types
//!
//! Error types for the API client and the data manager.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Network      │  │    NotFound     │  │       Storage           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network(Api-   │  │  BeaconNot-     │  │  Database               │ │
//! │  │  Error)         │  │  Registered     │  │  Preferences            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │      Auth       │  │  Configuration  │  │      Validation         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  MissingAccess- │  │  InvalidConfig  │  │  Validation(Validation- │ │
//! │  │  Token, 401     │  │  InvalidUrl     │  │  Error)                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Network errors are only ever recovered inside `DataManager::get_venues`;
//! every other operation hands them back unchanged.

use ribot_core::ValidationError;
use ribot_db::DbError;
use thiserror::Error;

/// Result type alias for data manager operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for ribot API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Maximum length for error response bodies in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

// =============================================================================
// API Error
// =============================================================================

/// A failed call to the ribot API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the access token is missing, expired or revoked.
    #[error("Unauthorized - access token rejected")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    /// Connectivity, timeout or body decoding failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }

        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classifies a non-2xx response.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

// =============================================================================
// Sync Error
// =============================================================================

/// Everything a [`DataManager`](crate::DataManager) operation can fail with.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Network Errors
    // =========================================================================
    /// The ribot API call failed.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    // =========================================================================
    // Not Found
    // =========================================================================
    /// A scanned beacon triple has no registered match.
    #[error("Beacon not registered: uuid={uuid} major={major} minor={minor}")]
    BeaconNotRegistered { uuid: String, major: u16, minor: u16 },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Relational store failure.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Preferences document could not be read or written.
    #[error("Preferences error: {0}")]
    Preferences(String),

    // =========================================================================
    // Auth Errors
    // =========================================================================
    /// No access token has been stored yet.
    #[error("No access token stored. Sign in first.")]
    MissingAccessToken,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Validation / Internal
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A background task died before producing its result.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Preferences(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a remote call failed (any status, or no response).
    pub fn is_network_error(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }

    /// Returns true if the user has to sign in again.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SyncError::MissingAccessToken | SyncError::Network(ApiError::Unauthorized)
        )
    }

    /// Returns true if a local store failed.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, SyncError::Database(_) | SyncError::Preferences(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "no venue"),
            ApiError::NotFound(body) if body == "no venue"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, "tea"),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH);
        match ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ApiError::ServerError(msg) => {
                assert!(msg.contains("truncated"));
                assert!(msg.len() < body.len());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_categories() {
        let unauthorized = SyncError::Network(ApiError::Unauthorized);
        assert!(unauthorized.is_network_error());
        assert!(unauthorized.is_auth_error());

        assert!(SyncError::MissingAccessToken.is_auth_error());
        assert!(!SyncError::MissingAccessToken.is_network_error());

        let not_registered = SyncError::BeaconNotRegistered {
            uuid: "u".into(),
            major: 1,
            minor: 2,
        };
        assert!(!not_registered.is_network_error());
        assert!(!not_registered.is_storage_error());
        assert!(not_registered.to_string().contains("major=1"));

        assert!(SyncError::Preferences("disk full".into()).is_storage_error());
        assert!(SyncError::Database(DbError::PoolExhausted).is_storage_error());
        assert!(SyncError::InvalidUrl("ftp://x".into()).is_config_error());
    }
}
