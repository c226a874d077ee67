//! # ribot-sync: Data Manager for the Ribot Data Layer
//!
//! Mediates between the ribot REST API, the on-device preferences cache and
//! the relational beacon store, and tells the rest of the app what happened.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            DataManager                                  │
//! │                                                                         │
//! │   Cache-first venue reads, check-in/out, beacon encounters, sign-out    │
//! └───────┬──────────────────────┬──────────────────────┬───────────────────┘
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//! ┌────────────────┐   ┌──────────────────┐   ┌────────────────────────┐
//! │ RibotService   │   │ PreferencesStore │   │ ribot_db::Database     │
//! │                │   │                  │   │                        │
//! │ HTTP + bearer  │   │ JSON document,   │   │ registered_beacons     │
//! │ auth (reqwest) │   │ watch-backed     │   │ (SQLite)               │
//! │                │   │ latest-state     │   │                        │
//! └───────┬────────┘   └──────────────────┘   └────────────────────────┘
//!         │ 401
//!         ▼
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │ EventBus: UserSignedOut, BeaconsSyncCompleted, AuthenticationError     │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML configuration with environment overrides
//! - [`data_manager`] - The `DataManager` facade
//! - [`error`] - `SyncError` and `ApiError`
//! - [`events`] - Broadcast event bus
//! - [`preferences`] - Key-value cache with observable slots
//! - [`remote`] - `RibotService` trait and its HTTP implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ribot_db::{Database, DbConfig};
//! use ribot_sync::{DataManager, EventBus, HttpRibotService, PreferencesStore, RibotConfig};
//! use std::sync::Arc;
//!
//! let config = RibotConfig::load_or_default(None);
//! let events = EventBus::default();
//!
//! let database = Database::new(DbConfig::new(config.database_path()?)).await?;
//! let preferences = PreferencesStore::open(config.preferences_path()?).await?;
//! let service = HttpRibotService::from_config(&config, events.clone())?;
//!
//! let manager = DataManager::new(Arc::new(service), Arc::new(preferences), database, events);
//! manager.sync_registered_beacons().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod data_manager;
pub mod error;
pub mod events;
pub mod preferences;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ApiSettings, RibotConfig, StorageSettings};
pub use data_manager::DataManager;
pub use error::{ApiError, ApiResult, SyncError, SyncResult};
pub use events::{EventBus, EventSubscription};
pub use preferences::{CheckOutOutcome, PreferencesStore};
pub use remote::{build_authorization, HttpRibotService, RibotService};
