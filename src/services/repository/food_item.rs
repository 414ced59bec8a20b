//! Food item repository and the detail join.

use super::{require_id, require_name, translate_missing};
use crate::models::{
    FoodItem, FoodItemDraft, FoodItemWithDetails, ReferenceKind, ReferenceRecord, UNKNOWN_ICON,
    UNKNOWN_NAME,
};
use crate::services::clock::Clock;
use crate::services::status::classify;
use crate::storage::{ConnectionSupervisor, StorageBackend};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

const ENTITY: &str = "food item";

/// CRUD over food items plus the joined, status-annotated view.
#[derive(Clone)]
pub struct FoodItemRepository {
    supervisor: Arc<ConnectionSupervisor>,
    clock: Arc<dyn Clock>,
}

impl FoodItemRepository {
    /// Creates a repository stamping creation dates from `clock`.
    #[must_use]
    pub fn new(supervisor: Arc<ConnectionSupervisor>, clock: Arc<dyn Clock>) -> Self {
        Self { supervisor, clock }
    }

    /// Returns every item, soonest expiry first.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or the read fails.
    pub fn get_all(&self) -> Result<Vec<FoodItem>> {
        self.supervisor.run(|session| session.backend().list_food_items())
    }

    /// Returns the item with `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or the read fails.
    pub fn get_by_id(&self, id: i64) -> Result<Option<FoodItem>> {
        self.supervisor.run(|session| session.backend().get_food_item(id))
    }

    /// Inserts an item dated today and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a blank name and
    /// [`Error::ConstraintViolation`] if a referenced category or location
    /// does not exist.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn create(&self, draft: &FoodItemDraft) -> Result<i64> {
        require_name(ENTITY, &draft.name)?;
        let today = self.clock.today();
        self.supervisor.run(|session| {
            let backend = session.backend();
            require_reference(backend, ReferenceKind::Category, draft.category_id)?;
            require_reference(backend, ReferenceKind::Location, draft.location_id)?;
            backend.create_food_item(draft, today)
        })
    }

    /// Replaces the writable fields of an existing item.
    ///
    /// `created_at` is kept from the stored row. References are checked only
    /// when they change, so an item left dangling by a reference delete can
    /// still be edited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a missing id or blank name and
    /// [`Error::ConstraintViolation`] if the item or a newly referenced
    /// category or location does not exist.
    #[instrument(skip(self, item), fields(id = item.id))]
    pub fn update(&self, item: &FoodItem) -> Result<()> {
        require_id(ENTITY, item.id)?;
        require_name(ENTITY, &item.name)?;
        self.supervisor.run(|session| {
            let backend = session.backend();
            let stored = backend.get_food_item(item.id)?.ok_or_else(|| {
                translate_missing(Error::NotFound {
                    entity: ENTITY,
                    id: item.id,
                })
            })?;
            if item.category_id != stored.category_id {
                require_reference(backend, ReferenceKind::Category, item.category_id)?;
            }
            if item.location_id != stored.location_id {
                require_reference(backend, ReferenceKind::Location, item.location_id)?;
            }
            backend.update_food_item(item).map_err(translate_missing)
        })
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a missing id and
    /// [`Error::ConstraintViolation`] if no item has the id.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<()> {
        require_id(ENTITY, id)?;
        self.supervisor
            .run(|session| session.backend().delete_food_item(id).map_err(translate_missing))
    }

    /// Returns every item joined with its references, classified against
    /// the clock's today.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or a read fails.
    pub fn get_all_with_details(&self) -> Result<Vec<FoodItemWithDetails>> {
        self.get_all_with_details_at(self.clock.today())
    }

    /// Returns every item joined with its references, classified against
    /// `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or a read fails.
    pub fn get_all_with_details_at(&self, today: NaiveDate) -> Result<Vec<FoodItemWithDetails>> {
        self.supervisor
            .run(|session| details_from(session.backend(), today))
    }
}

impl fmt::Debug for FoodItemRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoodItemRepository")
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

/// Reads items and both reference tables from one backend and joins them.
fn details_from(backend: &dyn StorageBackend, today: NaiveDate) -> Result<Vec<FoodItemWithDetails>> {
    let items = backend.list_food_items()?;
    let categories = backend.list_references(ReferenceKind::Category)?;
    let locations = backend.list_references(ReferenceKind::Location)?;
    Ok(join_details(items, &categories, &locations, today))
}

fn require_reference(backend: &dyn StorageBackend, kind: ReferenceKind, id: Option<i64>) -> Result<()> {
    let Some(id) = id else {
        return Ok(());
    };
    if backend.get_reference(kind, id)?.is_none() {
        return Err(Error::ConstraintViolation(format!("{kind} {id} does not exist")));
    }
    Ok(())
}

/// Joins items with reference snapshots and derives their status.
///
/// Missing or dangling references resolve to the unknown sentinel. Input
/// order is preserved.
#[must_use]
pub fn join_details(
    items: Vec<FoodItem>,
    categories: &[ReferenceRecord],
    locations: &[ReferenceRecord],
    today: NaiveDate,
) -> Vec<FoodItemWithDetails> {
    let categories: HashMap<i64, &ReferenceRecord> = categories.iter().map(|r| (r.id, r)).collect();
    let locations: HashMap<i64, &ReferenceRecord> = locations.iter().map(|r| (r.id, r)).collect();

    items
        .into_iter()
        .map(|item| {
            let (category_name, category_icon) = resolve(&categories, item.category_id);
            let (location_name, location_icon) = resolve(&locations, item.location_id);
            let freshness = classify(today, item.expiry_date);
            FoodItemWithDetails {
                item,
                category_name,
                category_icon,
                location_name,
                location_icon,
                days_until_expiry: freshness.days_until_expiry,
                status: freshness.status,
            }
        })
        .collect()
}

fn resolve(rows: &HashMap<i64, &ReferenceRecord>, id: Option<i64>) -> (String, String) {
    id.and_then(|id| rows.get(&id)).map_or_else(
        || (UNKNOWN_NAME.to_string(), UNKNOWN_ICON.to_string()),
        |r| (r.name.clone(), r.icon.clone()),
    )
}
