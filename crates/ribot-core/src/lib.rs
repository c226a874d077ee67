//! # ribot-core: Domain Types for the Ribot Data Layer
//!
//! This crate holds the types every other layer talks in. It has zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ribot Data Layer                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Callers (CLI, presenters)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        ribot-sync: DataManager, preferences, API client         │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐                   │                    │
//! │  │  ribot-db: beacon table     │                   │                    │
//! │  └──────────────┬──────────────┘                   │                    │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼───────────────┐   │
//! │  │               ★ ribot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  events   │  │   date    │  │ validation│  │   │
//! │  │   │  Venue    │  │ BusEvent  │  │ is_today  │  │   ids     │  │   │
//! │  │   │  CheckIn  │  │           │  │           │  │  labels   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Venue, CheckIn, Encounter, RegisteredBeacon, Ribot)
//! - [`events`] - Notifications published on the event bus
//! - [`date`] - Local calendar-day helpers
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Example Usage
//!
//! ```rust
//! use ribot_core::CheckInRequest;
//!
//! let request = CheckInRequest::from_label("Brighton office").unwrap();
//! assert!(matches!(request, CheckInRequest::Label { .. }));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod date;
pub mod error;
pub mod events;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use events::BusEvent;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a free-text check-in label.
pub const MAX_LABEL_LENGTH: usize = 100;

/// Embed parameter asking the API to inline each ribot's latest check-in.
pub const EMBED_LATEST_CHECK_IN: &str = "latestCheckIn";
