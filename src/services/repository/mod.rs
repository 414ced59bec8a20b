//! Repositories over the supervised backend.
//!
//! Every call goes through [`ConnectionSupervisor::run`](crate::storage::ConnectionSupervisor::run),
//! so a failed statement fails over like a failed probe. No repository holds
//! a backend handle across calls.

mod food_item;
mod reference;

pub use food_item::{FoodItemRepository, join_details};
pub use reference::ReferenceRepository;

use crate::{Error, Result};

/// Rejects ids that cannot belong to a persisted row.
fn require_id(entity: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(Error::InvalidArgument(format!("{entity} id is required")));
    }
    Ok(())
}

/// Rejects blank names.
fn require_name(entity: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{entity} name must not be empty")));
    }
    Ok(())
}

/// Turns a backend-level miss into a constraint violation.
fn translate_missing(err: Error) -> Error {
    match err {
        Error::NotFound { entity, id } => {
            Error::ConstraintViolation(format!("{entity} {id} does not exist"))
        },
        other => other,
    }
}
