//! Top-level handle wiring supervisor, repositories and cache together.

use super::cache::CacheOrchestrator;
use super::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::storage::{BackendOpener, ConnectionSupervisor, DefaultOpener, EphemeralOpener};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// An opened inventory store.
#[derive(Debug)]
pub struct FreshStore {
    supervisor: Arc<ConnectionSupervisor>,
    cache: CacheOrchestrator,
}

impl FreshStore {
    /// Opens the store described by `config` on the system clock.
    ///
    /// The backend is opened eagerly, so a store that cannot run even in
    /// degraded mode fails here rather than on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BackendUnavailable`] if no backend can be opened.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let opener = DefaultOpener::new(
            &config.data_dir,
            config.database_name.clone(),
            config.flat_store_path(),
        );
        tracing::debug!(
            database = %config.database_path().display(),
            flat_store = %config.flat_store_path().display(),
            "Opening store"
        );
        Self::with_opener(
            Box::new(opener),
            config,
            Arc::new(SystemClock),
        )
    }

    /// Opens a store with a custom opener and clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BackendUnavailable`] if no backend can be opened.
    pub fn with_opener(
        opener: Box<dyn BackendOpener>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let supervisor = Arc::new(ConnectionSupervisor::new(opener, config.language));
        supervisor.open()?;
        let cache = CacheOrchestrator::new(
            supervisor.clone(),
            clock,
            Duration::from_secs(config.cache_max_age_secs),
        );
        Ok(Self { supervisor, cache })
    }

    /// Opens an in-memory store. Nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory engine cannot be created.
    pub fn ephemeral(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_opener(Box::new(EphemeralOpener::new()), &StoreConfig::default(), clock)
    }

    /// The cache, which is also the mutation entry point.
    #[must_use]
    pub const fn cache(&self) -> &CacheOrchestrator {
        &self.cache
    }

    /// The connection supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }
}
