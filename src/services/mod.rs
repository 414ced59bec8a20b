//! Business logic services.
//!
//! Services sit on top of the [`ConnectionSupervisor`](crate::storage::ConnectionSupervisor)
//! and provide repositories, freshness derivation and the cache.

mod cache;
mod clock;
mod integrity;
mod repository;
mod status;
mod store;

pub use cache::{
    CacheCollection, CacheOrchestrator, CacheStatus, CollectionStatus, DEFAULT_MAX_AGE,
    DashboardCounts,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use integrity::{MIN_ROWS, PLACEHOLDER_PERCENT, check_references};
pub use repository::{FoodItemRepository, ReferenceRepository, join_details};
pub use status::{classify, classify_at};
pub use store::FreshStore;
