//! # Domain Types
//!
//! Core domain types shared by the stores, the API client and the data manager.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Venue       │◄──│    CheckIn      │◄──│   Encounter     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  label          │   │  venue | label  │   │  encounter_date │       │
//! │  │  lat / lng      │   │  checked_in_date│   │  beacon ────────┼──┐    │
//! │  └─────────────────┘   │  checked_out    │   │  check_in       │  │    │
//! │                        └─────────────────┘   └─────────────────┘  │    │
//! │                                                                   ▼    │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │     Ribot       │   │      Zone       │◄──│  RegisteredBeacon   │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  profile        │   │  id             │   │  id                 │   │
//! │  │  latest_check_in│   │  label          │   │  (uuid,major,minor) │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! All types serialize to the camelCase JSON used by the ribot API, e.g.
//! `checked_in_date` ⇄ `"checkedInDate"`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::date;
use crate::error::ValidationError;
use crate::validation;

// =============================================================================
// Venue
// =============================================================================

/// A place people can check in at.
///
/// Equality is field-by-field, which is what the venue cache uses to decide
/// whether a freshly fetched list differs from the cached one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    /// Server-side identifier.
    pub id: String,

    /// Display name ("ribot studio", "Brighton office").
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

// =============================================================================
// Check-in
// =============================================================================

/// A manual or beacon-triggered check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    /// Server-side identifier.
    pub id: String,

    /// Free-text location, set when the check-in was not at a known venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Venue the check-in happened at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,

    /// When the user checked in.
    pub checked_in_date: DateTime<Utc>,

    /// Whether the user has since checked out.
    #[serde(default)]
    pub checked_out: bool,
}

impl CheckIn {
    /// Returns a human-readable location for the check-in.
    pub fn location_name(&self) -> Option<&str> {
        self.venue
            .as_ref()
            .map(|v| v.label.as_str())
            .or(self.label.as_deref())
    }

    /// Returns true if the check-in happened on the device's current calendar day.
    pub fn is_today(&self) -> bool {
        date::is_today(self.checked_in_date)
    }
}

/// Request body for creating a check-in.
///
/// A check-in is either at a known venue or at a free-text location, never
/// both. Use [`CheckInRequest::from_venue`] or [`CheckInRequest::from_label`].
///
/// ## Wire Format
/// ```text
/// from_venue("v1")   →  {"venueId": "v1"}
/// from_label("home") →  {"label": "home"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CheckInRequest {
    /// Check in at a venue known to the server.
    Venue {
        #[serde(rename = "venueId")]
        venue_id: String,
    },

    /// Check in at a free-text location.
    Label { label: String },
}

impl CheckInRequest {
    /// Creates a venue-based check-in request.
    pub fn from_venue(venue_id: impl Into<String>) -> Result<Self, ValidationError> {
        let venue_id = venue_id.into();
        validation::validate_id("venue_id", &venue_id)?;
        Ok(CheckInRequest::Venue { venue_id })
    }

    /// Creates a label-based check-in request.
    pub fn from_label(label: impl Into<String>) -> Result<Self, ValidationError> {
        let label = label.into().trim().to_string();
        validation::validate_label(&label)?;
        Ok(CheckInRequest::Label { label })
    }
}

/// Request body for updating an existing check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckInRequest {
    pub checked_out: bool,
}

impl UpdateCheckInRequest {
    /// The only update the app performs: marking a check-in as checked out.
    pub fn check_out() -> Self {
        UpdateCheckInRequest { checked_out: true }
    }
}

// =============================================================================
// Beacons
// =============================================================================

/// An area inside a venue that one or more beacons cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub label: String,
}

/// A beacon registered with the ribot API.
///
/// The `(uuid, major, minor)` triple is what scanning hardware reports; `id`
/// is what the API expects when recording an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredBeacon {
    pub id: String,
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
}

/// The result of walking past a registered beacon.
///
/// Encounters create (or refresh) a check-in on the server, which is embedded
/// here so the app can tell which check-in an encounter produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: String,
    pub encounter_date: DateTime<Utc>,
    pub beacon: RegisteredBeacon,
    pub check_in: CheckIn,
}

impl Encounter {
    /// Identifier of the check-in this encounter resulted in.
    pub fn check_in_id(&self) -> &str {
        &self.check_in.id
    }
}

// =============================================================================
// Ribots
// =============================================================================

/// A member of the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ribot {
    pub profile: Profile,

    /// Only present when requested through the `embed` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_check_in: Option<CheckIn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: Name,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    pub first: String,
    pub last: String,
}

impl Name {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
