//! # Repository Module
//!
//! Database repository implementations for the relational store.
//!
//! ```text
//! DataManager
//!      │  db.beacons().find(uuid, major, minor)
//!      ▼
//! RegisteredBeaconRepository
//! ├── find(&self, uuid, major, minor)
//! ├── find_uuids(&self)
//! ├── list(&self)
//! ├── set_all(&self, beacons)
//! └── count(&self)
//!      │
//!      ▼
//! SQLite Database
//! ```
//!
//! ## Available Repositories
//!
//! - [`RegisteredBeaconRepository`](beacon::RegisteredBeaconRepository) - Beacon registry

pub mod beacon;
