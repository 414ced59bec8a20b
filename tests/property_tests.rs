//! Property-based tests for classification and persistence invariants.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use chrono::{Days, NaiveDate};
use common::date;
use freshkeep::models::{EXPIRING_SOON_DAYS, ImageRef};
use freshkeep::storage::{FlatStore, MemoryKeyValueStore, SchemaManager, SqliteEngine};
use freshkeep::{
    ExpiryStatus, FixedClock, FoodItemDraft, FreshStore, Language, ReferenceKind, StorageBackend,
    classify,
};
use proptest::prelude::*;
use std::sync::Arc;

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (0_u64..20_000).prop_map(|offset| date(1990, 1, 1) + Days::new(offset))
}

fn any_image_uri() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["🥛", "🍞", "🧀", "🥚", "🍎"])
            .prop_map(|symbol| ImageRef::symbol_uri(symbol)),
        "[a-z0-9_]{1,12}".prop_map(|name| format!("file:///photos/{name}.jpg")),
    ]
}

fn any_draft() -> impl Strategy<Value = FoodItemDraft> {
    (
        "[A-Za-z][A-Za-z ]{0,20}",
        0_u32..100,
        proptest::option::of(1_i64..=8),
        proptest::option::of(1_i64..=4),
        any_date(),
        0_u32..14,
        proptest::option::of("[a-z ]{0,30}"),
        proptest::option::of(any_image_uri()),
    )
        .prop_map(
            |(name, quantity, category_id, location_id, expiry_date, reminder_days, notes, image_uri)| {
                FoodItemDraft {
                    name,
                    quantity,
                    category_id,
                    location_id,
                    expiry_date,
                    reminder_days,
                    notes,
                    image_uri,
                }
            },
        )
}

fn backends() -> Vec<Box<dyn StorageBackend>> {
    let sqlite: Box<dyn StorageBackend> = Box::new(SqliteEngine::in_memory().unwrap());
    let flat: Box<dyn StorageBackend> =
        Box::new(FlatStore::new(Arc::new(MemoryKeyValueStore::new())));
    vec![sqlite, flat]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_classification_matches_day_difference(today in any_date(), expiry in any_date()) {
        let freshness = classify(today, expiry);
        let days = (expiry - today).num_days();
        prop_assert_eq!(freshness.days_until_expiry, days);
        let expected = if days < 0 {
            ExpiryStatus::Expired
        } else if days <= EXPIRING_SOON_DAYS {
            ExpiryStatus::ExpiringSoon
        } else {
            ExpiryStatus::Fresh
        };
        prop_assert_eq!(freshness.status, expected);
    }

    #[test]
    fn prop_status_never_improves_as_time_passes(today in any_date(), expiry in any_date(), step in 1_u64..30) {
        let earlier = classify(today, expiry).status;
        let later = classify(today + Days::new(step), expiry).status;
        let rank = |s: ExpiryStatus| match s {
            ExpiryStatus::Fresh => 0,
            ExpiryStatus::ExpiringSoon => 1,
            ExpiryStatus::Expired => 2,
        };
        prop_assert!(rank(later) >= rank(earlier));
    }

    #[test]
    fn prop_language_parse_accepts_code_in_any_case(index in 0_usize..4) {
        let language = Language::all()[index];
        prop_assert_eq!(Language::parse(language.as_str()), Some(language));
        prop_assert_eq!(Language::parse(&language.as_str().to_uppercase()), Some(language));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_created_item_reads_back_unchanged(draft in any_draft()) {
        let created_at = date(2024, 1, 1);
        for backend in backends() {
            SchemaManager::initialize(backend.as_ref(), Language::En).unwrap();
            let id = backend.create_food_item(&draft, created_at).unwrap();
            let stored = backend.get_food_item(id).unwrap().unwrap();
            prop_assert_eq!(stored.id, id);
            prop_assert_eq!(stored.created_at, created_at);
            prop_assert_eq!(
                stored.image_uri.as_deref().map(|uri| ImageRef::parse(uri).is_symbol()),
                draft.image_uri.as_deref().map(|uri| uri.starts_with("emoji:"))
            );
            prop_assert_eq!(stored.to_draft(), draft.clone());
        }
    }

    #[test]
    fn prop_reference_delete_never_touches_items(
        drafts in proptest::collection::vec(any_draft(), 1..6),
        victim in 1_i64..=8,
    ) {
        for backend in backends() {
            SchemaManager::initialize(backend.as_ref(), Language::En).unwrap();
            for draft in &drafts {
                backend.create_food_item(draft, date(2024, 1, 1)).unwrap();
            }
            let before = backend.list_food_items().unwrap();
            backend.delete_reference(ReferenceKind::Category, victim).unwrap();
            prop_assert_eq!(backend.list_food_items().unwrap(), before);
        }
    }

    #[test]
    fn prop_each_mutation_bumps_version_once(drafts in proptest::collection::vec(any_draft(), 1..8)) {
        let store = FreshStore::ephemeral(Arc::new(FixedClock::new(date(2024, 1, 1)))).unwrap();
        let cache = store.cache();
        let mut ids = Vec::new();
        for draft in &drafts {
            ids.push(cache.create_food_item(draft).unwrap());
        }
        for id in ids.iter().step_by(2) {
            cache.delete_food_item(*id).unwrap();
        }
        let expected = drafts.len() + ids.iter().step_by(2).count();
        prop_assert_eq!(cache.data_version(), expected as u64);
        prop_assert_eq!(cache.food_items().len(), drafts.len() - ids.iter().step_by(2).count());
    }
}
