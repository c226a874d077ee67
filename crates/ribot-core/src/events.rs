//! # Bus Events
//!
//! The closed set of notifications the data layer publishes.
//!
//! ```text
//! DataManager::sign_out()                ──► UserSignedOut
//! DataManager::sync_registered_beacons() ──► BeaconsSyncCompleted
//! HTTP 401 from the ribot API            ──► AuthenticationError
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A notification broadcast to every current bus subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusEvent {
    /// All local state was wiped; UI should return to its signed-out state.
    UserSignedOut,

    /// The registered beacon table was replaced with a fresh server copy.
    BeaconsSyncCompleted,

    /// The API rejected the stored access token.
    AuthenticationError,
}

impl BusEvent {
    /// Stable name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusEvent::UserSignedOut => "user_signed_out",
            BusEvent::BeaconsSyncCompleted => "beacons_sync_completed",
            BusEvent::AuthenticationError => "authentication_error",
        }
    }
}

impl fmt::Display for BusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
