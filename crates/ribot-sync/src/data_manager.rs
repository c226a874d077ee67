//! # Data Manager
//!
//! The single entry point callers use. Every operation composes the ribot
//! API, the preferences store and the relational store.
//!
//! ## Venue Refresh
//! ```text
//! get_venues()
//!     │
//!     ├──► emit cached list (or [])
//!     │
//!     ├──► GET venues ──ok──► put_venues(fresh) ──► emit fresh if != last
//!     │         │
//!     │         └──err──► cache non-empty? ──yes──► emit cache if != last
//!     │                                    └─no───► emit error
//!     ▼
//!   end of stream
//! ```
//!
//! ## Latest-State Slots
//! ```text
//! check_in()                  ──► latest_check_in  = result
//! check_out(id)               ──► latest_check_in  = result   if latest.id == id
//!                             ──► latest_encounter = None     if encounter.check_in.id == id
//! perform_beacon_encounter()  ──► latest_encounter = result
//! ```
//!
//! ## Sign-out Ordering
//! ```text
//! clear_tables() ──ok──► preferences.clear() ──ok──► post(UserSignedOut)
//!       │                       │
//!       └──err──► return        └──err──► return       (no event either way)
//! ```
//!
//! ## Cancellation
//! Local writes that follow a committed remote call, and the whole sign-out
//! sequence, run on a spawned task. Dropping the caller's future stops
//! delivery of the result, never the write.

use futures_util::stream::{self, Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, EventSubscription};
use crate::preferences::PreferencesStore;
use crate::remote::{build_authorization, RibotService};
use ribot_core::validation::validate_id;
use ribot_core::{
    BusEvent, CheckIn, CheckInRequest, Encounter, Ribot, UpdateCheckInRequest, Venue,
    EMBED_LATEST_CHECK_IN,
};
use ribot_db::Database;

/// Progress of one `get_venues` stream.
enum VenueStage {
    Cached,
    Refresh { last: Vec<Venue> },
    Done,
}

/// Result of the background fetch-and-cache step.
enum VenueFetch {
    Fresh(Vec<Venue>),
    FetchFailed(SyncError),
    CacheWriteFailed(SyncError),
}

/// Coordinates the ribot API, the preferences store and the relational store.
///
/// Clone is cheap; clones share every collaborator.
#[derive(Clone)]
pub struct DataManager {
    service: Arc<dyn RibotService>,
    preferences: Arc<PreferencesStore>,
    database: Database,
    events: EventBus,
}

impl DataManager {
    pub fn new(
        service: Arc<dyn RibotService>,
        preferences: Arc<PreferencesStore>,
        database: Database,
        events: EventBus,
    ) -> Self {
        DataManager {
            service,
            preferences,
            database,
            events,
        }
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Stores the access token every authenticated call uses.
    pub async fn set_access_token(&self, token: impl Into<String>) -> SyncResult<()> {
        self.preferences.put_access_token(token).await
    }

    pub fn access_token(&self) -> Option<String> {
        self.preferences.access_token()
    }

    fn authorization(&self) -> SyncResult<String> {
        self.preferences
            .access_token()
            .map(|token| build_authorization(&token))
            .ok_or(SyncError::MissingAccessToken)
    }

    /// Wipes all local state and announces [`BusEvent::UserSignedOut`].
    ///
    /// Relational store first, then preferences, then the event. A failure
    /// at any step stops the sequence and no event is posted. Once started,
    /// the sequence runs to the end even if the caller stops waiting.
    pub async fn sign_out(&self) -> SyncResult<()> {
        info!("Signing out");

        let manager = self.clone();
        detached(async move {
            manager.database.clear_tables().await?;
            manager.preferences.clear().await?;
            manager.events.post(BusEvent::UserSignedOut);
            Ok::<_, SyncError>(())
        })
        .await
    }

    /// Subscribes to data layer notifications.
    pub fn events(&self) -> EventSubscription {
        self.events.subscribe()
    }

    // =========================================================================
    // Ribots
    // =========================================================================

    /// Lists team members with their latest check-in inlined.
    pub async fn get_ribots(&self) -> SyncResult<Vec<Ribot>> {
        let auth = self.authorization()?;
        let ribots = self
            .service
            .list_ribots(&auth, EMBED_LATEST_CHECK_IN)
            .await?;

        debug!(count = ribots.len(), "Ribots fetched");
        Ok(ribots)
    }

    // =========================================================================
    // Venues
    // =========================================================================

    /// Cached venues first, then the server's list if it differs.
    ///
    /// ## Emits
    /// 1. The cached list, or `[]` if nothing is cached
    /// 2. The fetched list, unless equal to the previous emission; it is
    ///    written to the cache first
    ///
    /// If the fetch fails, a non-empty cache is re-emitted (subject to the
    /// same duplicate rule) and the stream ends cleanly; with an empty
    /// cache the fetch error is the last item.
    ///
    /// Nothing runs until the stream is polled. Once the fetch has started,
    /// dropping the stream does not stop the cache write.
    pub fn get_venues(&self) -> impl Stream<Item = SyncResult<Vec<Venue>>> + Send + 'static {
        let manager = self.clone();

        stream::unfold(VenueStage::Cached, move |stage| {
            let manager = manager.clone();
            async move {
                match stage {
                    VenueStage::Cached => {
                        let cached = manager.preferences.venues().unwrap_or_default();
                        debug!(count = cached.len(), "Emitting cached venues");
                        Some((Ok(cached.clone()), VenueStage::Refresh { last: cached }))
                    }
                    VenueStage::Refresh { last } => manager
                        .refresh_venues(last)
                        .await
                        .map(|item| (item, VenueStage::Done)),
                    VenueStage::Done => None,
                }
            }
        })
    }

    /// Fetches and caches venues; returns the item to emit, if any.
    async fn refresh_venues(&self, last: Vec<Venue>) -> Option<SyncResult<Vec<Venue>>> {
        let manager = self.clone();
        let fetch = tokio::spawn(async move {
            let fresh = match manager.fetch_venues().await {
                Ok(venues) => venues,
                Err(e) => return VenueFetch::FetchFailed(e),
            };
            match manager.preferences.put_venues(fresh.clone()).await {
                Ok(()) => VenueFetch::Fresh(fresh),
                Err(e) => VenueFetch::CacheWriteFailed(e),
            }
        });

        let outcome = match fetch.await {
            Ok(outcome) => outcome,
            Err(e) => return Some(Err(SyncError::Internal(e.to_string()))),
        };

        match outcome {
            VenueFetch::Fresh(fresh) => {
                debug!(count = fresh.len(), "Venues refreshed");
                (fresh != last).then_some(Ok(fresh))
            }
            VenueFetch::CacheWriteFailed(e) => Some(Err(e)),
            VenueFetch::FetchFailed(e) => match self.preferences.venues() {
                Some(cached) if !cached.is_empty() => {
                    warn!(error = %e, "Venue refresh failed, falling back to cache");
                    (cached != last).then_some(Ok(cached))
                }
                _ => Some(Err(e)),
            },
        }
    }

    async fn fetch_venues(&self) -> SyncResult<Vec<Venue>> {
        let auth = self.authorization()?;
        Ok(self.service.list_venues(&auth).await?)
    }

    // =========================================================================
    // Check-ins
    // =========================================================================

    /// Checks in and records the result as the latest check-in.
    pub async fn check_in(&self, request: CheckInRequest) -> SyncResult<CheckIn> {
        let auth = self.authorization()?;
        let check_in = self.service.check_in(&auth, &request).await?;

        let preferences = self.preferences.clone();
        let latest = check_in.clone();
        detached(async move { preferences.put_latest_check_in(latest).await }).await?;

        info!(check_in_id = %check_in.id, "Checked in");
        Ok(check_in)
    }

    /// Marks `check_in_id` as checked out.
    ///
    /// On success the latest check-in is replaced if it is this one, and the
    /// latest encounter is cleared if it produced this one.
    pub async fn check_out(&self, check_in_id: &str) -> SyncResult<CheckIn> {
        validate_id("check_in_id", check_in_id)?;
        let auth = self.authorization()?;

        let updated = self
            .service
            .update_check_in(&auth, check_in_id, &UpdateCheckInRequest::check_out())
            .await?;

        let preferences = self.preferences.clone();
        let (id, latest) = (check_in_id.to_string(), updated.clone());
        let outcome =
            detached(async move { preferences.apply_check_out(&id, latest).await }).await?;

        info!(
            check_in_id,
            check_in_updated = outcome.check_in_updated,
            encounter_cleared = outcome.encounter_cleared,
            "Checked out"
        );
        Ok(updated)
    }

    /// The latest check-in, every time it changes.
    pub fn latest_check_in(&self) -> impl Stream<Item = Option<CheckIn>> + Send + 'static {
        self.preferences.watch_latest_check_in()
    }

    /// The latest check-in, only when it happened today (device local time).
    ///
    /// Values from other days, and an empty slot, are skipped rather than
    /// mapped to anything.
    pub fn today_latest_check_in(&self) -> impl Stream<Item = CheckIn> + Send + 'static {
        self.preferences
            .watch_latest_check_in()
            .filter_map(|latest| async move { latest.filter(CheckIn::is_today) })
    }

    // =========================================================================
    // Beacons
    // =========================================================================

    /// Records an encounter with a known beacon.
    pub async fn perform_beacon_encounter(&self, beacon_id: &str) -> SyncResult<Encounter> {
        validate_id("beacon_id", beacon_id)?;
        let auth = self.authorization()?;

        let encounter = self
            .service
            .perform_beacon_encounter(&auth, beacon_id)
            .await?;

        let preferences = self.preferences.clone();
        let latest = encounter.clone();
        detached(async move { preferences.put_latest_encounter(latest).await }).await?;

        info!(
            beacon_id,
            encounter_id = %encounter.id,
            check_in_id = %encounter.check_in_id(),
            "Beacon encounter recorded"
        );
        Ok(encounter)
    }

    /// Resolves a scanned triple to a registered beacon, then records the
    /// encounter.
    ///
    /// ## Errors
    /// [`SyncError::BeaconNotRegistered`] without any API call if the triple
    /// is unknown.
    pub async fn perform_beacon_encounter_for(
        &self,
        uuid: &str,
        major: u16,
        minor: u16,
    ) -> SyncResult<Encounter> {
        let beacon = self
            .database
            .beacons()
            .find(uuid, major, minor)
            .await?
            .ok_or_else(|| SyncError::BeaconNotRegistered {
                uuid: uuid.to_string(),
                major,
                minor,
            })?;

        self.perform_beacon_encounter(&beacon.id).await
    }

    /// The latest encounter, every time it changes.
    pub fn latest_encounter(&self) -> impl Stream<Item = Option<Encounter>> + Send + 'static {
        self.preferences.watch_latest_encounter()
    }

    /// Replaces the local beacon registry with the server's and posts
    /// [`BusEvent::BeaconsSyncCompleted`].
    ///
    /// ## Returns
    /// Number of beacons now registered.
    pub async fn sync_registered_beacons(&self) -> SyncResult<usize> {
        let auth = self.authorization()?;
        let beacons = self.service.list_registered_beacons(&auth).await?;
        let count = beacons.len();

        let (repository, events) = (self.database.beacons(), self.events.clone());
        detached(async move {
            repository.set_all(&beacons).await?;
            events.post(BusEvent::BeaconsSyncCompleted);
            Ok::<_, SyncError>(())
        })
        .await?;

        info!(count, "Registered beacons synced");
        Ok(count)
    }

    /// Distinct UUIDs of the registered beacons, for configuring scanners.
    ///
    /// Lazy: the table is read when the stream is first polled.
    pub fn find_registered_beacons_uuids(
        &self,
    ) -> impl Stream<Item = SyncResult<String>> + Send + 'static {
        let beacons = self.database.beacons();

        stream::once(async move { beacons.find_uuids().await })
            .flat_map(|result| {
                let items: Vec<SyncResult<String>> = match result {
                    Ok(uuids) => uuids.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e.into())],
                };
                stream::iter(items)
            })
    }
}

/// Runs `work` on its own task and waits for it.
///
/// The work completes even if the returned future is dropped.
async fn detached<T, F>(work: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| SyncError::Internal(e.to_string()))?
}
