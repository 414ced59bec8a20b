//! Category and location repository.

use super::{require_id, require_name, translate_missing};
use crate::models::{ReferenceDraft, ReferenceKind, ReferenceRecord};
use crate::storage::ConnectionSupervisor;
use crate::Result;
use std::sync::Arc;
use tracing::instrument;

/// CRUD over one reference table.
///
/// Categories and locations have identical shape and rules, so one
/// repository type serves both, parameterised by [`ReferenceKind`].
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    supervisor: Arc<ConnectionSupervisor>,
    kind: ReferenceKind,
}

impl ReferenceRepository {
    /// Creates a repository for `kind`.
    #[must_use]
    pub const fn new(supervisor: Arc<ConnectionSupervisor>, kind: ReferenceKind) -> Self {
        Self { supervisor, kind }
    }

    /// Repository over categories.
    #[must_use]
    pub const fn categories(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self::new(supervisor, ReferenceKind::Category)
    }

    /// Repository over locations.
    #[must_use]
    pub const fn locations(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self::new(supervisor, ReferenceKind::Location)
    }

    /// Returns every row, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or the read fails.
    pub fn get_all(&self) -> Result<Vec<ReferenceRecord>> {
        self.supervisor
            .run(|session| session.backend().list_references(self.kind))
    }

    /// Returns the row with `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is available or the read fails.
    pub fn get_by_id(&self, id: i64) -> Result<Option<ReferenceRecord>> {
        self.supervisor
            .run(|session| session.backend().get_reference(self.kind, id))
    }

    /// Inserts a row and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] for a blank name.
    #[instrument(skip(self, draft), fields(kind = %self.kind))]
    pub fn create(&self, draft: &ReferenceDraft) -> Result<i64> {
        require_name(self.kind.as_str(), &draft.name)?;
        self.supervisor
            .run(|session| session.backend().create_reference(self.kind, draft))
    }

    /// Replaces the name and icon of an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] for a missing id or blank
    /// name and [`crate::Error::ConstraintViolation`] if no row has the id.
    #[instrument(skip(self, record), fields(kind = %self.kind, id = record.id))]
    pub fn update(&self, record: &ReferenceRecord) -> Result<()> {
        require_id(self.kind.as_str(), record.id)?;
        require_name(self.kind.as_str(), &record.name)?;
        self.supervisor.run(|session| {
            session
                .backend()
                .update_reference(self.kind, record)
                .map_err(translate_missing)
        })
    }

    /// Deletes a row. Food items pointing at it are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] for a missing id and
    /// [`crate::Error::ConstraintViolation`] if no row has the id.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub fn delete(&self, id: i64) -> Result<()> {
        require_id(self.kind.as_str(), id)?;
        self.supervisor.run(|session| {
            session
                .backend()
                .delete_reference(self.kind, id)
                .map_err(translate_missing)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;
    use crate::storage::EphemeralOpener;
    use crate::Error;

    fn repo(kind: ReferenceKind) -> ReferenceRepository {
        let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
        ReferenceRepository::new(Arc::new(supervisor), kind)
    }

    #[test]
    fn test_create_then_get() {
        let repo = repo(ReferenceKind::Category);
        let id = repo.create(&ReferenceDraft::new("Spices", "leaf")).unwrap();
        assert_eq!(
            repo.get_by_id(id).unwrap(),
            Some(ReferenceRecord::new(id, "Spices", "leaf"))
        );
        assert_eq!(repo.get_all().unwrap().len(), 9);
    }

    #[test]
    fn test_blank_name_rejected() {
        let repo = repo(ReferenceKind::Location);
        let err = repo.create(&ReferenceDraft::new("  ", "home")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = repo.update(&ReferenceRecord::new(1, "", "fridge")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_id_is_invalid_argument() {
        let repo = repo(ReferenceKind::Category);
        assert!(matches!(repo.delete(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            repo.update(&ReferenceRecord::new(-3, "Dairy", "cheese")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_id_is_constraint_violation() {
        let repo = repo(ReferenceKind::Location);
        assert!(matches!(repo.delete(99), Err(Error::ConstraintViolation(_))));
        assert!(matches!(
            repo.update(&ReferenceRecord::new(99, "Shed", "home")),
            Err(Error::ConstraintViolation(_))
        ));
    }
}
