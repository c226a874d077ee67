//! # Preferences Store
//!
//! Persisted key-value state: the venues cache, the latest check-in, the
//! latest encounter and the access token.
//!
//! ## Slot Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PreferencesStore                                  │
//! │                                                                         │
//! │   write_lock (tokio Mutex) ── serialises every read-modify-write        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   1. snapshot current slots                                             │
//! │   2. apply the change                                                   │
//! │   3. write JSON to <file>.tmp, rename over <file>                       │
//! │   4. publish changed slots                                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌───────────┐ ┌────────────────┐ ┌─────────────────┐ ┌────────────┐  │
//! │   │  venues   │ │latest_check_in │ │latest_encounter │ │access_token│  │
//! │   │  watch    │ │    watch       │ │     watch       │ │   watch    │  │
//! │   └─────┬─────┘ └───────┬────────┘ └────────┬────────┘ └────────────┘  │
//! │         ▼               ▼                   ▼                           │
//! │    WatchStream     WatchStream         WatchStream                      │
//! │    (current value first, then each change)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Observers only ever see values that made it to disk. A slow observer
//! skips intermediate values and sees the newest one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use ribot_core::{CheckIn, Encounter, Venue};

// =============================================================================
// Document
// =============================================================================

/// On-disk shape of the preferences file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    venues: Option<Vec<Venue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    latest_check_in: Option<CheckIn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    latest_encounter: Option<Encounter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

// =============================================================================
// Observable Slot
// =============================================================================

/// A single observable value. Subscribers get the current value first.
#[derive(Debug)]
struct Slot<T> {
    sender: watch::Sender<Option<T>>,
}

impl<T> Slot<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn new(initial: Option<T>) -> Self {
        let (sender, _) = watch::channel(initial);
        Slot { sender }
    }

    fn get(&self) -> Option<T> {
        self.sender.borrow().clone()
    }

    /// Stores `value`, notifying subscribers only if it changed.
    fn set(&self, value: Option<T>) {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    fn watch(&self) -> WatchStream<Option<T>> {
        WatchStream::new(self.sender.subscribe())
    }
}

// =============================================================================
// Check-out Outcome
// =============================================================================

/// Which latest-state slots a check-out touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOutOutcome {
    /// The latest check-in was the one checked out and now carries the
    /// updated value.
    pub check_in_updated: bool,

    /// The latest encounter came from the checked-out check-in and was cleared.
    pub encounter_cleared: bool,
}

// =============================================================================
// Store
// =============================================================================

/// Persisted settings with an observable slot per tracked entity.
#[derive(Debug)]
pub struct PreferencesStore {
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
    venues: Slot<Vec<Venue>>,
    latest_check_in: Slot<CheckIn>,
    latest_encounter: Slot<Encounter>,
    access_token: Slot<String>,
}

impl PreferencesStore {
    /// Opens the preferences document at `path`, creating it on first write.
    ///
    /// An unreadable or corrupt document is logged and treated as empty; the
    /// next write replaces it.
    pub async fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<PreferencesData>(&bytes) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt preferences file, starting empty");
                    PreferencesData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file yet");
                PreferencesData::default()
            }
            Err(e) => return Err(SyncError::Preferences(e.to_string())),
        };

        info!(path = %path.display(), "Preferences loaded");
        Ok(Self::from_data(Some(path), data))
    }

    /// Creates a store that never touches disk.
    pub fn in_memory() -> Self {
        Self::from_data(None, PreferencesData::default())
    }

    fn from_data(path: Option<PathBuf>, data: PreferencesData) -> Self {
        PreferencesStore {
            path,
            write_lock: Mutex::new(()),
            venues: Slot::new(data.venues),
            latest_check_in: Slot::new(data.latest_check_in),
            latest_encounter: Slot::new(data.latest_encounter),
            access_token: Slot::new(data.access_token),
        }
    }

    /// Location of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn venues(&self) -> Option<Vec<Venue>> {
        self.venues.get()
    }

    pub fn latest_check_in(&self) -> Option<CheckIn> {
        self.latest_check_in.get()
    }

    pub fn latest_encounter(&self) -> Option<Encounter> {
        self.latest_encounter.get()
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.get()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn watch_venues(&self) -> WatchStream<Option<Vec<Venue>>> {
        self.venues.watch()
    }

    pub fn watch_latest_check_in(&self) -> WatchStream<Option<CheckIn>> {
        self.latest_check_in.watch()
    }

    pub fn watch_latest_encounter(&self) -> WatchStream<Option<Encounter>> {
        self.latest_encounter.watch()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn put_venues(&self, venues: Vec<Venue>) -> SyncResult<()> {
        self.update(|data| data.venues = Some(venues)).await
    }

    pub async fn put_latest_check_in(&self, check_in: CheckIn) -> SyncResult<()> {
        self.update(|data| data.latest_check_in = Some(check_in)).await
    }

    pub async fn put_latest_encounter(&self, encounter: Encounter) -> SyncResult<()> {
        self.update(|data| data.latest_encounter = Some(encounter)).await
    }

    pub async fn clear_latest_encounter(&self) -> SyncResult<()> {
        self.update(|data| data.latest_encounter = None).await
    }

    pub async fn put_access_token(&self, token: impl Into<String>) -> SyncResult<()> {
        let token = token.into();
        self.update(|data| data.access_token = Some(token)).await
    }

    /// Wipes every key.
    pub async fn clear(&self) -> SyncResult<()> {
        info!("Clearing preferences");
        self.update(|data| *data = PreferencesData::default()).await
    }

    /// Applies a successful check-out of `check_in_id` to the latest-state
    /// slots, as one atomic update.
    ///
    /// ## Rules
    /// - latest check-in has id `check_in_id` → replaced with `updated`
    /// - latest encounter came from check-in `check_in_id` → cleared
    ///
    /// The two rules are independent.
    pub async fn apply_check_out(
        &self,
        check_in_id: &str,
        updated: CheckIn,
    ) -> SyncResult<CheckOutOutcome> {
        self.update(|data| {
            let mut outcome = CheckOutOutcome::default();

            if let Some(latest) = data.latest_check_in.as_mut() {
                if latest.id == check_in_id {
                    *latest = updated;
                    outcome.check_in_updated = true;
                }
            }

            if data
                .latest_encounter
                .as_ref()
                .is_some_and(|e| e.check_in_id() == check_in_id)
            {
                data.latest_encounter = None;
                outcome.encounter_cleared = true;
            }

            outcome
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn snapshot(&self) -> PreferencesData {
        PreferencesData {
            venues: self.venues.get(),
            latest_check_in: self.latest_check_in.get(),
            latest_encounter: self.latest_encounter.get(),
            access_token: self.access_token.get(),
        }
    }

    async fn update<R>(&self, change: impl FnOnce(&mut PreferencesData) -> R) -> SyncResult<R> {
        let _guard = self.write_lock.lock().await;

        let mut data = self.snapshot();
        let result = change(&mut data);

        if let Some(path) = &self.path {
            persist(path, &data).await?;
        }

        self.venues.set(data.venues);
        self.latest_check_in.set(data.latest_check_in);
        self.latest_encounter.set(data.latest_encounter);
        self.access_token.set(data.access_token);

        Ok(result)
    }
}

/// Writes `data` next to `path` and renames it into place.
async fn persist(path: &Path, data: &PreferencesData) -> SyncResult<()> {
    let bytes = serde_json::to_vec_pretty(data)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Preferences(e.to_string()))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| SyncError::Preferences(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SyncError::Preferences(e.to_string()))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Preferences written");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ribot_core::RegisteredBeacon;
    use tokio_stream::StreamExt;

    fn venue(id: &str) -> Venue {
        Venue {
            id: id.to_string(),
            label: format!("Venue {id}"),
            latitude: None,
            longitude: None,
        }
    }

    fn check_in(id: &str, checked_out: bool) -> CheckIn {
        CheckIn {
            id: id.to_string(),
            label: Some("Home".to_string()),
            venue: None,
            checked_in_date: Utc::now(),
            checked_out,
        }
    }

    fn encounter(id: &str, check_in_id: &str) -> Encounter {
        Encounter {
            id: id.to_string(),
            encounter_date: Utc::now(),
            beacon: RegisteredBeacon {
                id: "b1".to_string(),
                uuid: "f7826da6-4fa2-4e98-8024-bc5b71e0893e".to_string(),
                major: 1,
                minor: 1,
                zone: None,
            },
            check_in: check_in(check_in_id, false),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = PreferencesStore::in_memory();
        assert!(store.venues().is_none());

        store.put_venues(vec![venue("v1")]).await.unwrap();
        store.put_latest_check_in(check_in("c1", false)).await.unwrap();
        store.put_access_token("token").await.unwrap();

        assert_eq!(store.venues(), Some(vec![venue("v1")]));
        assert_eq!(store.latest_check_in().map(|c| c.id), Some("c1".to_string()));
        assert_eq!(store.access_token().as_deref(), Some("token"));
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_clear_wipes_everything() {
        let store = PreferencesStore::in_memory();
        store.put_venues(vec![venue("v1")]).await.unwrap();
        store.put_latest_encounter(encounter("e1", "c1")).await.unwrap();
        store.put_access_token("token").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.venues().is_none());
        assert!(store.latest_encounter().is_none());
        assert!(store.access_token().is_none());
    }

    #[tokio::test]
    async fn test_clear_latest_encounter_only() {
        let store = PreferencesStore::in_memory();
        store.put_latest_check_in(check_in("c1", false)).await.unwrap();
        store.put_latest_encounter(encounter("e1", "c1")).await.unwrap();

        store.clear_latest_encounter().await.unwrap();

        assert!(store.latest_encounter().is_none());
        assert!(store.latest_check_in().is_some());
    }

    #[tokio::test]
    async fn test_watch_yields_current_value_then_updates() {
        let store = PreferencesStore::in_memory();
        store.put_latest_check_in(check_in("c1", false)).await.unwrap();

        let mut stream = store.watch_latest_check_in();
        let first = stream.next().await.unwrap();
        assert_eq!(first.map(|c| c.id), Some("c1".to_string()));

        store.put_latest_check_in(check_in("c2", false)).await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(second.map(|c| c.id), Some("c2".to_string()));
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        let store = PreferencesStore::in_memory();
        let mut a = store.watch_venues();
        let mut b = store.watch_venues();

        assert_eq!(a.next().await.unwrap(), None);
        store.put_venues(vec![venue("v1")]).await.unwrap();

        // `b` has not polled yet and still starts from the current value.
        assert_eq!(b.next().await.unwrap(), Some(vec![venue("v1")]));
        assert_eq!(a.next().await.unwrap(), Some(vec![venue("v1")]));
    }

    #[tokio::test]
    async fn test_check_out_updates_matching_slots() {
        let store = PreferencesStore::in_memory();
        store.put_latest_check_in(check_in("c1", false)).await.unwrap();
        store.put_latest_encounter(encounter("e1", "c1")).await.unwrap();

        let outcome = store.apply_check_out("c1", check_in("c1", true)).await.unwrap();

        assert_eq!(
            outcome,
            CheckOutOutcome {
                check_in_updated: true,
                encounter_cleared: true
            }
        );
        assert!(store.latest_check_in().unwrap().checked_out);
        assert!(store.latest_encounter().is_none());
    }

    #[tokio::test]
    async fn test_check_out_leaves_other_slots_alone() {
        let store = PreferencesStore::in_memory();
        store.put_latest_check_in(check_in("c2", false)).await.unwrap();
        store.put_latest_encounter(encounter("e1", "c1")).await.unwrap();

        let outcome = store.apply_check_out("c1", check_in("c1", true)).await.unwrap();

        assert!(!outcome.check_in_updated);
        assert!(outcome.encounter_cleared);
        assert!(!store.latest_check_in().unwrap().checked_out);
    }

    #[tokio::test]
    async fn test_check_out_with_empty_slots() {
        let store = PreferencesStore::in_memory();

        let outcome = store.apply_check_out("c1", check_in("c1", true)).await.unwrap();

        assert_eq!(outcome, CheckOutOutcome::default());
        assert!(store.latest_check_in().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("ribot_app_pref_file.json");

        let store = PreferencesStore::open(&path).await.unwrap();
        store.put_venues(vec![venue("v1"), venue("v2")]).await.unwrap();
        store.put_latest_encounter(encounter("e1", "c1")).await.unwrap();
        drop(store);

        let reopened = PreferencesStore::open(&path).await.unwrap();
        assert_eq!(reopened.venues(), Some(vec![venue("v1"), venue("v2")]));
        assert_eq!(reopened.latest_encounter().map(|e| e.id), Some("e1".to_string()));
        assert!(!dir.path().join("prefs").join("ribot_app_pref_file.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = PreferencesStore::open(&path).await.unwrap();
        assert!(store.venues().is_none());

        store.put_access_token("t").await.unwrap();
        let reopened = PreferencesStore::open(&path).await.unwrap();
        assert_eq!(reopened.access_token().as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_slots_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("blocked");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let store = PreferencesStore::open(&path).await;
        // Reading a directory is an I/O error other than NotFound.
        assert!(matches!(store, Err(SyncError::Preferences(_))));

        let store = PreferencesStore::from_data(Some(path), PreferencesData::default());
        let result = store.put_venues(vec![venue("v1")]).await;

        assert!(matches!(result, Err(SyncError::Preferences(_))));
        assert!(store.venues().is_none());
    }
}
