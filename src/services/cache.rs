//! Versioned read-through cache over the repositories.
//!
//! The cache is the only thing a presentation layer needs to talk to: it
//! serves categories, locations, detail-joined food items and dashboard
//! counts from memory, and routes every mutation through the repositories
//! before bumping [`CacheOrchestrator::data_version`] and refreshing.
//!
//! A refresh is all-or-nothing. Collections are fetched from one backend
//! session and swapped in together, so a failed fetch leaves the previous
//! snapshot intact and a snapshot never mixes backends.

use super::clock::Clock;
use super::integrity::check_references;
use super::repository::{FoodItemRepository, ReferenceRepository, join_details};
use crate::models::{
    ExpiryStatus, FoodItem, FoodItemDraft, FoodItemWithDetails, Language, ReferenceDraft,
    ReferenceKind, ReferenceRecord,
};
use crate::storage::{ConnectionSupervisor, SchemaManager, StorageBackend, SupervisorState};
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default age after which [`CacheOrchestrator::ensure_fresh`] refetches.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// The cached collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCollection {
    /// Category rows.
    Categories,
    /// Location rows.
    Locations,
    /// Detail-joined food items and the counts derived from them.
    FoodItems,
}

impl CacheCollection {
    /// Returns all collections.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Categories, Self::Locations, Self::FoodItems]
    }

    /// Returns the collection name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Locations => "locations",
            Self::FoodItems => "food_items",
        }
    }

    /// Parses a collection name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "categories" | "category" => Some(Self::Categories),
            "locations" | "location" => Some(Self::Locations),
            "food_items" | "food-items" | "items" => Some(Self::FoodItems),
            _ => None,
        }
    }
}

impl fmt::Display for CacheCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-status tally of the cached food items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    /// All items.
    pub total: usize,
    /// Items past their expiry date.
    pub expired: usize,
    /// Items inside the expiring-soon window.
    pub expiring_soon: usize,
    /// Items outside the window.
    pub fresh: usize,
}

impl DashboardCounts {
    /// Tallies `items` by status.
    #[must_use]
    pub fn from_items(items: &[FoodItemWithDetails]) -> Self {
        items.iter().fold(Self::default(), |mut counts, item| {
            counts.total += 1;
            match item.status {
                ExpiryStatus::Expired => counts.expired += 1,
                ExpiryStatus::ExpiringSoon => counts.expiring_soon += 1,
                ExpiryStatus::Fresh => counts.fresh += 1,
            }
            counts
        })
    }

    /// Returns the tally for one status.
    #[must_use]
    pub const fn count(&self, status: ExpiryStatus) -> usize {
        match status {
            ExpiryStatus::Expired => self.expired,
            ExpiryStatus::ExpiringSoon => self.expiring_soon,
            ExpiryStatus::Fresh => self.fresh,
        }
    }
}

/// Diagnostic view of one cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionStatus {
    /// The collection.
    pub collection: CacheCollection,
    /// A snapshot has been loaded.
    pub cached: bool,
    /// Marked stale, or older than the configured max age.
    pub stale: bool,
    /// Seconds since the snapshot was loaded.
    pub age_secs: Option<u64>,
    /// Rows in the snapshot.
    pub rows: usize,
}

/// Diagnostic view of the whole cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    /// One entry per collection.
    pub collections: Vec<CollectionStatus>,
    /// Current data version.
    pub data_version: u64,
    /// The first refresh has succeeded.
    pub data_available: bool,
    /// Which backend is serving requests.
    pub backend_state: String,
    /// Wall-clock time of the last successful refresh.
    pub last_refreshed: Option<DateTime<Utc>>,
    /// Most recent integrity warning, if any.
    pub last_integrity_warning: Option<String>,
}

#[derive(Default)]
struct CacheState {
    categories: Vec<ReferenceRecord>,
    locations: Vec<ReferenceRecord>,
    food_items: Vec<FoodItemWithDetails>,
    counts: DashboardCounts,
    available: bool,
    loaded_at: Option<Instant>,
    refreshed_on: Option<NaiveDate>,
    last_refreshed: Option<DateTime<Utc>>,
    stale: HashSet<CacheCollection>,
    known_good_categories: Vec<ReferenceRecord>,
    known_good_locations: Vec<ReferenceRecord>,
    last_integrity_warning: Option<String>,
}

impl CacheState {
    fn known_good(&self, kind: ReferenceKind) -> &[ReferenceRecord] {
        match kind {
            ReferenceKind::Category => &self.known_good_categories,
            ReferenceKind::Location => &self.known_good_locations,
        }
    }
}

/// A freshly fetched set of collections, ready to swap in.
struct Fetched {
    categories: Vec<ReferenceRecord>,
    locations: Vec<ReferenceRecord>,
    food_items: Vec<FoodItemWithDetails>,
    today: NaiveDate,
    categories_healthy: bool,
    locations_healthy: bool,
    warnings: Vec<String>,
}

/// Versioned in-memory snapshot of the inventory.
///
/// # Example
///
/// ```rust,ignore
/// let cache = store.cache();
/// cache.refresh_all()?;
/// let id = cache.create_food_item(&FoodItemDraft::new("Milk", expiry).with_category(1))?;
/// assert_eq!(cache.dashboard_counts().total, 1);
/// ```
pub struct CacheOrchestrator {
    supervisor: Arc<ConnectionSupervisor>,
    categories: ReferenceRepository,
    locations: ReferenceRepository,
    food_items: FoodItemRepository,
    clock: Arc<dyn Clock>,
    max_age: Duration,
    state: RwLock<CacheState>,
    data_version: AtomicU64,
}

impl CacheOrchestrator {
    /// Creates an empty cache over the supervisor's backend.
    #[must_use]
    pub fn new(supervisor: Arc<ConnectionSupervisor>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
        Self {
            categories: ReferenceRepository::categories(supervisor.clone()),
            locations: ReferenceRepository::locations(supervisor.clone()),
            food_items: FoodItemRepository::new(supervisor.clone(), clock.clone()),
            supervisor,
            clock,
            max_age,
            state: RwLock::new(CacheState::default()),
            data_version: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The category repository.
    #[must_use]
    pub const fn category_repository(&self) -> &ReferenceRepository {
        &self.categories
    }

    /// The location repository.
    #[must_use]
    pub const fn location_repository(&self) -> &ReferenceRepository {
        &self.locations
    }

    /// The food item repository.
    #[must_use]
    pub const fn food_item_repository(&self) -> &FoodItemRepository {
        &self.food_items
    }

    /// Monotonic counter bumped once per mutation.
    #[must_use]
    pub fn data_version(&self) -> u64 {
        self.data_version.load(Ordering::SeqCst)
    }

    /// True once the first refresh has succeeded.
    #[must_use]
    pub fn is_data_available(&self) -> bool {
        self.read().available
    }

    /// Cached categories.
    #[must_use]
    pub fn categories(&self) -> Vec<ReferenceRecord> {
        self.read().categories.clone()
    }

    /// Cached locations.
    #[must_use]
    pub fn locations(&self) -> Vec<ReferenceRecord> {
        self.read().locations.clone()
    }

    /// Cached food items, soonest expiry first.
    #[must_use]
    pub fn food_items(&self) -> Vec<FoodItemWithDetails> {
        self.read().food_items.clone()
    }

    /// Cached food items with the given status. Never touches the backend.
    #[must_use]
    pub fn get_by_status(&self, status: ExpiryStatus) -> Vec<FoodItemWithDetails> {
        self.read()
            .food_items
            .iter()
            .filter(|item| item.status == status)
            .cloned()
            .collect()
    }

    /// Cached per-status tally.
    #[must_use]
    pub fn dashboard_counts(&self) -> DashboardCounts {
        self.read().counts
    }

    /// Fetches every collection and swaps the new snapshot in.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error; the previous snapshot is kept.
    #[instrument(skip(self))]
    pub fn refresh_all(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.fetch().map(|fetched| self.commit(fetched));
        metrics::counter!(
            "cache_refresh_total",
            "status" => if result.is_ok() { "success" } else { "error" }
        )
        .increment(1);
        metrics::histogram!("cache_refresh_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Cache refresh failed, keeping previous snapshot");
        }
        result
    }

    /// Reads every collection from a single session. If another caller
    /// failed the backend over while this fetch ran, the result is thrown
    /// away and read again from the replacement.
    fn fetch(&self) -> Result<Fetched> {
        let (fetched, session) = self
            .supervisor
            .run(|session| Ok((self.fetch_from(session.backend())?, session.clone())))?;
        if self.supervisor.is_current(&session) {
            return Ok(fetched);
        }
        tracing::debug!(
            identifier = session.identifier(),
            "Backend changed during refresh, fetching again"
        );
        self.supervisor.run(|session| self.fetch_from(session.backend()))
    }

    fn fetch_from(&self, backend: &dyn StorageBackend) -> Result<Fetched> {
        let mut warnings = Vec::new();
        let (categories, categories_healthy) =
            self.fetch_references(backend, ReferenceKind::Category, &mut warnings)?;
        let (locations, locations_healthy) =
            self.fetch_references(backend, ReferenceKind::Location, &mut warnings)?;
        let today = self.clock.today();
        let food_items = join_details(backend.list_food_items()?, &categories, &locations, today);
        Ok(Fetched {
            categories,
            locations,
            food_items,
            today,
            categories_healthy,
            locations_healthy,
            warnings,
        })
    }

    /// Fetches one reference table, restoring it from the last known-good
    /// snapshot if it looks corrupt. Returns the rows and whether they passed.
    fn fetch_references(
        &self,
        backend: &dyn StorageBackend,
        kind: ReferenceKind,
        warnings: &mut Vec<String>,
    ) -> Result<(Vec<ReferenceRecord>, bool)> {
        let rows = backend.list_references(kind)?;
        let Err(corruption) = check_references(kind, &rows) else {
            return Ok((rows, true));
        };

        metrics::counter!("cache_corruption_detected_total", "collection" => kind.table())
            .increment(1);
        let snapshot = self.read().known_good(kind).to_vec();
        if snapshot.is_empty() {
            tracing::warn!(error = %corruption, "Reference data looks corrupt, no snapshot to restore");
            warnings.push(corruption.to_string());
            return Ok((rows, false));
        }

        SchemaManager::restore_references(backend, kind, &snapshot)?;
        let restored = backend.list_references(kind)?;
        let healthy = check_references(kind, &restored).is_ok();
        tracing::warn!(
            error = %corruption,
            restored = snapshot.len(),
            healthy,
            "Reference data looked corrupt, restored from snapshot"
        );
        warnings.push(format!(
            "{corruption}; restored {} rows from snapshot",
            snapshot.len()
        ));
        Ok((restored, healthy))
    }

    fn commit(&self, fetched: Fetched) {
        let counts = DashboardCounts::from_items(&fetched.food_items);
        let mut state = self.write();
        if fetched.categories_healthy {
            state.known_good_categories.clone_from(&fetched.categories);
        }
        if fetched.locations_healthy {
            state.known_good_locations.clone_from(&fetched.locations);
        }
        if let Some(warning) = fetched.warnings.into_iter().last() {
            state.last_integrity_warning = Some(warning);
        }
        state.categories = fetched.categories;
        state.locations = fetched.locations;
        state.food_items = fetched.food_items;
        state.counts = counts;
        state.available = true;
        state.loaded_at = Some(Instant::now());
        state.refreshed_on = Some(fetched.today);
        state.last_refreshed = Some(Utc::now());
        state.stale.clear();
        tracing::debug!(
            total = counts.total,
            expired = counts.expired,
            expiring_soon = counts.expiring_soon,
            "Cache refreshed"
        );
    }

    /// Marks one collection stale so the next [`Self::ensure_fresh`] refetches.
    pub fn invalidate(&self, collection: CacheCollection) {
        self.write().stale.insert(collection);
        tracing::debug!(collection = %collection, "Cache invalidated");
    }

    /// Refreshes if nothing is cached, anything is stale, the snapshot is
    /// older than the max age, or the date has rolled over since it was taken.
    ///
    /// Returns true if a refresh happened.
    ///
    /// # Errors
    ///
    /// Returns the refresh error, if one was needed and failed.
    pub fn ensure_fresh(&self) -> Result<bool> {
        if !self.needs_refresh() {
            return Ok(false);
        }
        self.refresh_all()?;
        Ok(true)
    }

    fn needs_refresh(&self) -> bool {
        let state = self.read();
        !state.available
            || !state.stale.is_empty()
            || state.loaded_at.is_none_or(|at| at.elapsed() > self.max_age)
            || state.refreshed_on != Some(self.clock.today())
    }

    /// Returns per-collection diagnostics.
    #[must_use]
    pub fn get_cache_status(&self) -> CacheStatus {
        let state = self.read();
        let age = state.loaded_at.map(|at| at.elapsed());
        let expired = age.is_some_and(|age| age > self.max_age);
        let collections = CacheCollection::all()
            .iter()
            .map(|&collection| CollectionStatus {
                collection,
                cached: state.available,
                stale: state.available && (expired || state.stale.contains(&collection)),
                age_secs: age.map(|age| age.as_secs()),
                rows: match collection {
                    CacheCollection::Categories => state.categories.len(),
                    CacheCollection::Locations => state.locations.len(),
                    CacheCollection::FoodItems => state.food_items.len(),
                },
            })
            .collect();
        CacheStatus {
            collections,
            data_version: self.data_version(),
            data_available: state.available,
            backend_state: self.supervisor.state().to_string(),
            last_refreshed: state.last_refreshed,
            last_integrity_warning: state.last_integrity_warning.clone(),
        }
    }

    /// Which backend is currently serving requests.
    #[must_use]
    pub fn backend_state(&self) -> SupervisorState {
        self.supervisor.state()
    }

    /// Bumps the version, then refreshes. On refresh failure every
    /// collection is marked stale and the error is returned; the write
    /// itself has already succeeded.
    fn after_mutation(&self, operation: &'static str) -> Result<()> {
        let version = self.data_version.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::counter!("cache_mutations_total", "operation" => operation).increment(1);
        tracing::debug!(operation, version, "Data version bumped");
        self.refresh_all().inspect_err(|_| {
            self.write().stale.extend(CacheCollection::all().iter().copied());
        })
    }

    /// Creates a food item.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn create_food_item(&self, draft: &FoodItemDraft) -> Result<i64> {
        let id = self.food_items.create(draft)?;
        self.after_mutation("create_food_item")?;
        Ok(id)
    }

    /// Updates a food item.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn update_food_item(&self, item: &FoodItem) -> Result<()> {
        self.food_items.update(item)?;
        self.after_mutation("update_food_item")
    }

    /// Deletes a food item.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn delete_food_item(&self, id: i64) -> Result<()> {
        self.food_items.delete(id)?;
        self.after_mutation("delete_food_item")
    }

    const fn reference_repository(&self, kind: ReferenceKind) -> &ReferenceRepository {
        match kind {
            ReferenceKind::Category => &self.categories,
            ReferenceKind::Location => &self.locations,
        }
    }

    /// Creates a category or location.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn create_reference(&self, kind: ReferenceKind, draft: &ReferenceDraft) -> Result<i64> {
        let id = self.reference_repository(kind).create(draft)?;
        self.after_mutation("create_reference")?;
        Ok(id)
    }

    /// Updates a category or location.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn update_reference(&self, kind: ReferenceKind, record: &ReferenceRecord) -> Result<()> {
        self.reference_repository(kind).update(record)?;
        self.after_mutation("update_reference")
    }

    /// Deletes a category or location. Items pointing at it keep their
    /// reference and show as unknown.
    ///
    /// # Errors
    ///
    /// Returns the repository error, or the follow-up refresh error.
    pub fn delete_reference(&self, kind: ReferenceKind, id: i64) -> Result<()> {
        self.reference_repository(kind).delete(id)?;
        self.after_mutation("delete_reference")
    }

    /// Renames the default categories and locations into `language`.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or the follow-up refresh error.
    #[instrument(skip(self), fields(language = %language))]
    pub fn change_language(&self, language: Language) -> Result<()> {
        self.supervisor.set_language(language);
        self.supervisor
            .run(|session| SchemaManager::reseed(session.backend(), language))?;
        self.after_mutation("change_language")
    }

    /// Deletes all data and re-seeds defaults in the current language.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or the follow-up refresh error.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<()> {
        let language = self.supervisor.language();
        self.supervisor
            .run(|session| SchemaManager::reset(session.backend(), language))?;
        {
            let mut state = self.write();
            state.known_good_categories.clear();
            state.known_good_locations.clear();
            state.last_integrity_warning = None;
        }
        self.after_mutation("reset")
    }
}

impl fmt::Debug for CacheOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOrchestrator")
            .field("data_version", &self.data_version())
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}
