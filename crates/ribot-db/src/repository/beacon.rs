//! # Registered Beacon Repository
//!
//! Lookup and bulk replacement of the beacons registered with the ribot API.
//!
//! ## Replace-All Sync
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    set_all(fresh beacons)                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. DELETE FROM registered_beacons                              │   │
//! │  │  2. INSERT INTO registered_beacons ... (one per beacon)         │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← readers see the old set or the new set, never a mix          │
//! │                                                                         │
//! │  Any failed INSERT (e.g. duplicate triple) rolls the DELETE back.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ribot_core::{RegisteredBeacon, Zone};

/// Raw row as stored; major/minor are SQLite INTEGERs.
#[derive(Debug, FromRow)]
struct BeaconRow {
    id: String,
    uuid: String,
    major: i64,
    minor: i64,
    zone_id: Option<String>,
    zone_label: Option<String>,
}

impl TryFrom<BeaconRow> for RegisteredBeacon {
    type Error = DbError;

    fn try_from(row: BeaconRow) -> DbResult<Self> {
        let major = u16::try_from(row.major)
            .map_err(|_| DbError::invalid_row("beacon", &row.id, "major out of range"))?;
        let minor = u16::try_from(row.minor)
            .map_err(|_| DbError::invalid_row("beacon", &row.id, "minor out of range"))?;

        let zone = match (row.zone_id, row.zone_label) {
            (Some(id), Some(label)) => Some(Zone { id, label }),
            _ => None,
        };

        Ok(RegisteredBeacon {
            id: row.id,
            uuid: row.uuid,
            major,
            minor,
            zone,
        })
    }
}

/// Repository for registered beacon operations.
#[derive(Debug, Clone)]
pub struct RegisteredBeaconRepository {
    pool: SqlitePool,
}

impl RegisteredBeaconRepository {
    /// Creates a new RegisteredBeaconRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisteredBeaconRepository { pool }
    }

    /// Finds the beacon identified by a scanned (uuid, major, minor) triple.
    ///
    /// ## Returns
    /// * `Ok(Some(beacon))` - The triple is registered
    /// * `Ok(None)` - No registered beacon matches
    pub async fn find(&self, uuid: &str, major: u16, minor: u16) -> DbResult<Option<RegisteredBeacon>> {
        let row = sqlx::query_as::<_, BeaconRow>(
            r#"
            SELECT id, uuid, major, minor, zone_id, zone_label
            FROM registered_beacons
            WHERE uuid = ?1 AND major = ?2 AND minor = ?3
            "#,
        )
        .bind(uuid)
        .bind(i64::from(major))
        .bind(i64::from(minor))
        .fetch_optional(&self.pool)
        .await?;

        row.map(RegisteredBeacon::try_from).transpose()
    }

    /// Returns every registered beacon, ordered by id.
    pub async fn list(&self) -> DbResult<Vec<RegisteredBeacon>> {
        let rows = sqlx::query_as::<_, BeaconRow>(
            r#"
            SELECT id, uuid, major, minor, zone_id, zone_label
            FROM registered_beacons
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RegisteredBeacon::try_from).collect()
    }

    /// Returns the distinct proximity UUIDs of all registered beacons.
    ///
    /// Scanners register one region per UUID, so duplicates are dropped here.
    pub async fn find_uuids(&self) -> DbResult<Vec<String>> {
        let uuids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT uuid FROM registered_beacons ORDER BY uuid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(uuids)
    }

    /// Replaces the whole table with `beacons`.
    ///
    /// ## Returns
    /// Number of rows inserted.
    pub async fn set_all(&self, beacons: &[RegisteredBeacon]) -> DbResult<u64> {
        debug!(count = beacons.len(), "Replacing registered beacons");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let removed = sqlx::query("DELETE FROM registered_beacons")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0;
        for beacon in beacons {
            let (zone_id, zone_label) = match &beacon.zone {
                Some(zone) => (Some(zone.id.as_str()), Some(zone.label.as_str())),
                None => (None, None),
            };

            inserted += sqlx::query(
                r#"
                INSERT INTO registered_beacons (id, uuid, major, minor, zone_id, zone_label)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&beacon.id)
            .bind(&beacon.uuid)
            .bind(i64::from(beacon.major))
            .bind(i64::from(beacon.minor))
            .bind(zone_id)
            .bind(zone_label)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(removed, inserted, "Registered beacons replaced");
        Ok(inserted)
    }

    /// Counts registered beacons.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registered_beacons")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    const UUID_A: &str = "f7826da6-4fa2-4e98-8024-bc5b71e0893e";
    const UUID_B: &str = "b9407f30-f5f8-466e-aff9-25556b57fe6d";

    fn beacon(id: &str, uuid: &str, major: u16, minor: u16) -> RegisteredBeacon {
        RegisteredBeacon {
            id: id.to_string(),
            uuid: uuid.to_string(),
            major,
            minor,
            zone: None,
        }
    }

    async fn repo() -> RegisteredBeaconRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().beacons()
    }

    #[tokio::test]
    async fn test_find_by_triple() {
        let repo = repo().await;
        let mut with_zone = beacon("b1", UUID_A, 1, 2);
        with_zone.zone = Some(Zone {
            id: "z1".to_string(),
            label: "Kitchen".to_string(),
        });
        repo.set_all(&[with_zone.clone(), beacon("b2", UUID_A, 1, 3)])
            .await
            .unwrap();

        assert_eq!(repo.find(UUID_A, 1, 2).await.unwrap(), Some(with_zone));
        assert_eq!(repo.find(UUID_A, 2, 1).await.unwrap(), None);
        assert_eq!(repo.find(UUID_B, 1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_full_u16_range_round_trips() {
        let repo = repo().await;
        let edge = beacon("b1", UUID_A, u16::MAX, 0);
        repo.set_all(&[edge.clone()]).await.unwrap();

        assert_eq!(repo.find(UUID_A, u16::MAX, 0).await.unwrap(), Some(edge));
    }

    #[tokio::test]
    async fn test_set_all_replaces_previous_set() {
        let repo = repo().await;
        repo.set_all(&[beacon("old1", UUID_A, 1, 1), beacon("old2", UUID_A, 1, 2)])
            .await
            .unwrap();

        let fresh = vec![beacon("new1", UUID_B, 7, 7)];
        assert_eq!(repo.set_all(&fresh).await.unwrap(), 1);

        assert_eq!(repo.list().await.unwrap(), fresh);
        assert_eq!(repo.find(UUID_A, 1, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_prior_set() {
        let repo = repo().await;
        let prior = vec![beacon("b1", UUID_A, 1, 1)];
        repo.set_all(&prior).await.unwrap();

        // Same triple twice violates UNIQUE(uuid, major, minor).
        let result = repo
            .set_all(&[beacon("x1", UUID_B, 5, 5), beacon("x2", UUID_B, 5, 5)])
            .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(repo.list().await.unwrap(), prior);
    }

    #[tokio::test]
    async fn test_find_uuids_is_distinct() {
        let repo = repo().await;
        repo.set_all(&[
            beacon("b1", UUID_A, 1, 1),
            beacon("b2", UUID_A, 1, 2),
            beacon("b3", UUID_B, 1, 1),
        ])
        .await
        .unwrap();

        let mut uuids = repo.find_uuids().await.unwrap();
        uuids.sort();
        let mut expected = vec![UUID_A.to_string(), UUID_B.to_string()];
        expected.sort();
        assert_eq!(uuids, expected);
    }

    #[tokio::test]
    async fn test_empty_table() {
        let repo = repo().await;

        assert!(repo.find_uuids().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.set_all(&[]).await.unwrap(), 0);
    }
}
