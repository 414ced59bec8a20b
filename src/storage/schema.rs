//! Schema creation, seeding, re-seeding and reset.

use super::seeds::SeedSet;
use super::traits::StorageBackend;
use crate::models::{Language, ReferenceKind, ReferenceRecord};
use crate::Result;
use tracing::instrument;

/// What [`SchemaManager::initialize`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// First run: default reference data was seeded.
    Seeded,
    /// Defaults existed in another language and were renamed.
    Reseeded,
    /// Defaults already matched the requested language.
    Unchanged,
}

/// Creates and validates the schema and manages default reference data.
///
/// Operates on whatever backend it is handed; it holds no state.
pub struct SchemaManager;

impl SchemaManager {
    /// Ensures the schema exists and default reference data is present in
    /// `language`.
    #[instrument(skip(backend), fields(backend = %backend.kind(), language = %language))]
    pub fn initialize(backend: &dyn StorageBackend, language: Language) -> Result<InitOutcome> {
        backend.ensure_schema()?;
        match backend.seeded_language()? {
            None => {
                Self::seed_defaults(backend, language)?;
                Ok(InitOutcome::Seeded)
            },
            Some(seeded) if seeded == language => Ok(InitOutcome::Unchanged),
            Some(_) => {
                Self::reseed(backend, language)?;
                Ok(InitOutcome::Reseeded)
            },
        }
    }

    /// Writes every default row at its fixed id and sets the initialized flag.
    pub fn seed_defaults(backend: &dyn StorageBackend, language: Language) -> Result<()> {
        let seeds = SeedSet::for_language(language);
        for kind in ReferenceKind::all() {
            for record in seeds.records(*kind) {
                backend.put_reference(*kind, record)?;
            }
        }
        backend.mark_initialized(language)?;
        tracing::info!(
            backend = %backend.kind(),
            language = %language,
            categories = seeds.categories.len(),
            locations = seeds.locations.len(),
            "Seeded default reference data"
        );
        Ok(())
    }

    /// Renames the default rows that still exist to `language`.
    ///
    /// Ids, icons, user-created rows and deleted defaults are left alone.
    /// Returns the number of rows renamed.
    #[instrument(skip(backend), fields(backend = %backend.kind(), language = %language))]
    pub fn reseed(backend: &dyn StorageBackend, language: Language) -> Result<usize> {
        let seeds = SeedSet::for_language(language);
        let mut renamed = 0;
        for kind in ReferenceKind::all() {
            for seed in seeds.records(*kind) {
                let Some(existing) = backend.get_reference(*kind, seed.id)? else {
                    continue;
                };
                if existing.name != seed.name {
                    let updated = ReferenceRecord {
                        name: seed.name.clone(),
                        ..existing
                    };
                    backend.update_reference(*kind, &updated)?;
                    renamed += 1;
                }
            }
        }
        backend.mark_initialized(language)?;
        tracing::info!(renamed, "Re-seeded default reference names");
        Ok(renamed)
    }

    /// Deletes all data and seeds fresh defaults.
    #[instrument(skip(backend), fields(backend = %backend.kind(), language = %language))]
    pub fn reset(backend: &dyn StorageBackend, language: Language) -> Result<()> {
        backend.reset()?;
        tracing::warn!("All inventory data deleted");
        Self::seed_defaults(backend, language)
    }

    /// Writes a snapshot of reference rows back at their own ids.
    pub fn restore_references(
        backend: &dyn StorageBackend,
        kind: ReferenceKind,
        snapshot: &[ReferenceRecord],
    ) -> Result<()> {
        for record in snapshot {
            backend.put_reference(kind, record)?;
        }
        tracing::info!(kind = %kind, rows = snapshot.len(), "Restored reference snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceDraft;
    use crate::storage::flat::{FlatStore, MemoryKeyValueStore};
    use crate::storage::sqlite::SqliteEngine;
    use std::sync::Arc;

    fn backends() -> Vec<Box<dyn StorageBackend>> {
        vec![
            Box::new(SqliteEngine::in_memory().unwrap()),
            Box::new(FlatStore::new(Arc::new(MemoryKeyValueStore::new()))),
        ]
    }

    #[test]
    fn test_initialize_seeds_once() {
        for backend in backends() {
            let backend = backend.as_ref();
            assert_eq!(
                SchemaManager::initialize(backend, Language::En).unwrap(),
                InitOutcome::Seeded
            );
            assert_eq!(
                SchemaManager::initialize(backend, Language::En).unwrap(),
                InitOutcome::Unchanged
            );
            assert_eq!(backend.list_references(ReferenceKind::Category).unwrap().len(), 8);
            assert_eq!(backend.list_references(ReferenceKind::Location).unwrap().len(), 4);
        }
    }

    #[test]
    fn test_initialize_in_new_language_reseeds() {
        for backend in backends() {
            let backend = backend.as_ref();
            SchemaManager::initialize(backend, Language::En).unwrap();
            assert_eq!(
                SchemaManager::initialize(backend, Language::De).unwrap(),
                InitOutcome::Reseeded
            );
            let fridge = backend.get_reference(ReferenceKind::Location, 1).unwrap().unwrap();
            assert_eq!(fridge.name, "Kühlschrank");
            assert_eq!(backend.seeded_language().unwrap(), Some(Language::De));
        }
    }

    #[test]
    fn test_reseed_skips_user_rows_and_deleted_defaults() {
        for backend in backends() {
            let backend = backend.as_ref();
            SchemaManager::initialize(backend, Language::En).unwrap();
            let user = backend
                .create_reference(ReferenceKind::Category, &ReferenceDraft::new("Spices", "leaf"))
                .unwrap();
            backend.delete_reference(ReferenceKind::Category, 2).unwrap();

            let renamed = SchemaManager::reseed(backend, Language::Es).unwrap();
            assert_eq!(renamed, 7 + 4);

            let user_row = backend.get_reference(ReferenceKind::Category, user).unwrap().unwrap();
            assert_eq!(user_row.name, "Spices");
            assert!(backend.get_reference(ReferenceKind::Category, 2).unwrap().is_none());
        }
    }

    #[test]
    fn test_reset_reseeds_defaults() {
        for backend in backends() {
            let backend = backend.as_ref();
            SchemaManager::initialize(backend, Language::En).unwrap();
            backend
                .create_reference(ReferenceKind::Location, &ReferenceDraft::new("Shed", "home"))
                .unwrap();
            SchemaManager::reset(backend, Language::Fr).unwrap();
            let locations = backend.list_references(ReferenceKind::Location).unwrap();
            assert_eq!(locations.len(), 4);
            assert_eq!(locations[0].name, "Réfrigérateur");
        }
    }
}
