//! Connection supervision with one-shot recovery and permanent downgrade.
//!
//! # State machine
//!
//! ```text
//! Uninitialized ──open ok──────────────▶ Structured
//!       │                                   │ probe fails
//!       │ open fails                        ▼
//!       └──────────────▶ recovery (fresh identifier, once)
//!                              │ ok ──▶ Structured
//!                              │ fails
//!                              ▼
//!                           Degraded (flat store, for the process lifetime)
//! ```
//!
//! A failed statement counts like a failed probe: [`ConnectionSupervisor::run`]
//! recovers or downgrades, then retries the statement once on the new session.
//!
//! All transitions happen under one mutex, so concurrent callers of
//! [`ConnectionSupervisor::acquire`] and [`ConnectionSupervisor::run`] share a
//! single open or recovery.

use super::flat::{FileKeyValueStore, FlatStore, MemoryKeyValueStore};
use super::schema::SchemaManager;
use super::sqlite::{SqliteEngine, acquire_lock};
use super::traits::{BackendKind, StorageBackend};
use crate::models::Language;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Default file name of the structured database.
pub const DEFAULT_DATABASE_NAME: &str = "freshkeep.db";

/// Public view of the supervisor's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing has been opened yet.
    Uninitialized,
    /// The structured engine is serving requests.
    Structured,
    /// The flat store is serving requests; the structured engine is not retried.
    Degraded,
}

impl SupervisorState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Structured => "structured",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A live, probed handle to the active backend.
///
/// Cheap to clone; every clone refers to the same backend.
#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn StorageBackend>,
    identifier: String,
}

impl Session {
    /// Wraps a backend opened under `identifier`.
    pub fn new(backend: Arc<dyn StorageBackend>, identifier: impl Into<String>) -> Self {
        Self {
            backend,
            identifier: identifier.into(),
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Returns which kind of backend this session uses.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Returns the identifier the backend was opened under.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// True if both sessions refer to the same backend instance.
    #[must_use]
    pub fn same_backend(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.backend), Arc::as_ptr(&other.backend))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind())
            .field("identifier", &self.identifier)
            .finish()
    }
}

/// Opens backends on behalf of the supervisor.
pub trait BackendOpener: Send + Sync {
    /// Identifier of the structured database opened on startup.
    fn primary_identifier(&self) -> String {
        DEFAULT_DATABASE_NAME.to_string()
    }

    /// A fresh identifier for the recovery attempt.
    fn recovery_identifier(&self) -> String {
        format!(
            "freshkeep-recovery-{}.db",
            chrono::Utc::now().timestamp_millis()
        )
    }

    /// Opens the structured engine under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be opened.
    fn open_structured(&self, identifier: &str) -> Result<Arc<dyn StorageBackend>>;

    /// Opens the flat key-value store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    fn open_flat(&self) -> Result<Arc<dyn StorageBackend>>;
}

/// Opens the `SQLite` engine and file-backed flat store under the data directory.
#[derive(Debug, Clone)]
pub struct DefaultOpener {
    data_dir: PathBuf,
    database_name: String,
    flat_dir: PathBuf,
}

impl DefaultOpener {
    /// Creates an opener rooted at `data_dir`.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        database_name: impl Into<String>,
        flat_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_name: database_name.into(),
            flat_dir: flat_dir.into(),
        }
    }
}

impl BackendOpener for DefaultOpener {
    fn primary_identifier(&self) -> String {
        self.database_name.clone()
    }

    fn open_structured(&self, identifier: &str) -> Result<Arc<dyn StorageBackend>> {
        let engine = SqliteEngine::open(self.data_dir.join(identifier))?;
        Ok(Arc::new(engine))
    }

    fn open_flat(&self) -> Result<Arc<dyn StorageBackend>> {
        let kv = FileKeyValueStore::new(&self.flat_dir)?;
        Ok(Arc::new(FlatStore::new(Arc::new(kv))))
    }
}

/// Opens in-memory backends. Nothing survives the process.
#[derive(Debug, Default)]
pub struct EphemeralOpener {
    flat: Arc<MemoryKeyValueStore>,
}

impl EphemeralOpener {
    /// Creates an ephemeral opener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendOpener for EphemeralOpener {
    fn open_structured(&self, _identifier: &str) -> Result<Arc<dyn StorageBackend>> {
        Ok(Arc::new(SqliteEngine::in_memory()?))
    }

    fn open_flat(&self) -> Result<Arc<dyn StorageBackend>> {
        Ok(Arc::new(FlatStore::new(self.flat.clone())))
    }
}

enum State {
    Uninitialized,
    Structured(Session),
    Degraded(Session),
}

impl State {
    const fn public(&self) -> SupervisorState {
        match self {
            Self::Uninitialized => SupervisorState::Uninitialized,
            Self::Structured(_) => SupervisorState::Structured,
            Self::Degraded(_) => SupervisorState::Degraded,
        }
    }
}

/// Owns the active backend and hands out probed sessions.
///
/// # Example
///
/// ```rust,ignore
/// let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
/// let categories = supervisor.run(|s| s.backend().list_references(ReferenceKind::Category))?;
/// ```
pub struct ConnectionSupervisor {
    opener: Box<dyn BackendOpener>,
    language: RwLock<Language>,
    state: Mutex<State>,
    recovery_attempts: AtomicU64,
}

impl ConnectionSupervisor {
    /// Creates a supervisor. Nothing is opened until [`Self::open`] or
    /// [`Self::acquire`] is called.
    #[must_use]
    pub fn new(opener: Box<dyn BackendOpener>, language: Language) -> Self {
        Self {
            opener,
            language: RwLock::new(language),
            state: Mutex::new(State::Uninitialized),
            recovery_attempts: AtomicU64::new(0),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        acquire_lock(&self.state).public()
    }

    /// Returns how many recovery attempts have been made.
    #[must_use]
    pub fn recovery_attempts(&self) -> u64 {
        self.recovery_attempts.load(Ordering::Relaxed)
    }

    /// Returns the language used when seeding a freshly opened backend.
    #[must_use]
    pub fn language(&self) -> Language {
        *self
            .language
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Sets the language used when seeding a freshly opened backend.
    pub fn set_language(&self, language: Language) {
        *self
            .language
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = language;
    }

    /// Opens the backend if nothing is open yet.
    ///
    /// Idempotent: once a backend is open this returns its session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if the structured engine, its
    /// recovery and the flat store all fail.
    pub fn open(&self) -> Result<Session> {
        let mut state = acquire_lock(&self.state);
        match &*state {
            State::Structured(session) | State::Degraded(session) => Ok(session.clone()),
            State::Uninitialized => self.open_locked(&mut state),
        }
    }

    /// Returns a session that has just passed its liveness probe.
    ///
    /// A failed probe on the structured engine triggers one recovery attempt
    /// and, failing that, the permanent downgrade to the flat store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnavailable`] if no backend can serve requests.
    pub fn acquire(&self) -> Result<Session> {
        let mut state = acquire_lock(&self.state);
        match &*state {
            State::Uninitialized => self.open_locked(&mut state),
            State::Structured(session) => match session.backend().probe() {
                Ok(()) => Ok(session.clone()),
                Err(e) => {
                    tracing::warn!(
                        identifier = session.identifier(),
                        error = %e,
                        "Structured engine failed its probe"
                    );
                    self.recover_locked(&mut state)
                },
            },
            State::Degraded(session) => match session.backend().probe() {
                Ok(()) => Ok(session.clone()),
                Err(e) => {
                    tracing::error!(error = %e, "Flat store failed its probe");
                    Err(Error::BackendUnavailable(e.to_string()))
                },
            },
        }
    }

    /// Runs `operation` on a probed session.
    ///
    /// If the operation reports a connection failure and its session is still
    /// the active one, the supervisor recovers (or downgrades) exactly as for
    /// a failed probe. Callers that fail on a session someone else already
    /// replaced just pick up the replacement. Either way the operation is
    /// retried once on the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, or [`Error::BackendUnavailable`] if
    /// no backend can serve requests.
    pub fn run<T>(&self, mut operation: impl FnMut(&Session) -> Result<T>) -> Result<T> {
        let session = self.acquire()?;
        match operation(&session) {
            Err(e) if e.is_connection_failure() => {
                let replacement = self.fail_over(&session, &e)?;
                operation(&replacement)
            },
            result => result,
        }
    }

    /// True if `session` is the one currently serving requests.
    #[must_use]
    pub fn is_current(&self, session: &Session) -> bool {
        match &*acquire_lock(&self.state) {
            State::Structured(current) | State::Degraded(current) => current.same_backend(session),
            State::Uninitialized => false,
        }
    }

    fn fail_over(&self, failed: &Session, cause: &Error) -> Result<Session> {
        let mut state = acquire_lock(&self.state);
        match &*state {
            State::Structured(current) if current.same_backend(failed) => {
                tracing::warn!(
                    identifier = failed.identifier(),
                    error = %cause,
                    "Structured engine failed an operation"
                );
                self.recover_locked(&mut state)
            },
            State::Degraded(current) if current.same_backend(failed) => {
                tracing::error!(error = %cause, "Flat store failed an operation");
                Err(Error::BackendUnavailable(cause.to_string()))
            },
            State::Structured(current) | State::Degraded(current) => Ok(current.clone()),
            State::Uninitialized => self.open_locked(&mut state),
        }
    }

    fn open_locked(&self, state: &mut State) -> Result<Session> {
        let identifier = self.opener.primary_identifier();
        match self.try_structured(&identifier) {
            Ok(session) => {
                tracing::info!(identifier = %identifier, "Opened structured engine");
                *state = State::Structured(session.clone());
                Ok(session)
            },
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Structured engine failed to open"
                );
                self.recover_locked(state)
            },
        }
    }

    fn recover_locked(&self, state: &mut State) -> Result<Session> {
        self.recovery_attempts.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("storage_recovery_attempts_total").increment(1);

        let identifier = self.opener.recovery_identifier();
        match self.try_structured(&identifier) {
            Ok(session) => {
                tracing::warn!(identifier = %identifier, "Recovered onto a fresh structured database");
                metrics::counter!("storage_recovery_total", "status" => "success").increment(1);
                *state = State::Structured(session.clone());
                Ok(session)
            },
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Recovery failed, downgrading to flat store"
                );
                metrics::counter!("storage_recovery_total", "status" => "error").increment(1);
                self.downgrade_locked(state)
            },
        }
    }

    fn downgrade_locked(&self, state: &mut State) -> Result<Session> {
        let session = self.try_flat().map_err(|e| {
            tracing::error!(error = %e, "Flat store unavailable");
            Error::BackendUnavailable(e.to_string())
        })?;
        metrics::counter!(
            "storage_failover_total",
            "from" => BackendKind::Structured.as_str(),
            "to" => BackendKind::Flat.as_str()
        )
        .increment(1);
        tracing::warn!("Running degraded on the flat store");
        *state = State::Degraded(session.clone());
        Ok(session)
    }

    fn try_structured(&self, identifier: &str) -> Result<Session> {
        let backend = self.opener.open_structured(identifier)?;
        SchemaManager::initialize(backend.as_ref(), self.language())?;
        backend.probe()?;
        Ok(Session::new(backend, identifier))
    }

    fn try_flat(&self) -> Result<Session> {
        let backend = self.opener.open_flat()?;
        SchemaManager::initialize(backend.as_ref(), self.language())?;
        backend.probe()?;
        Ok(Session::new(backend, "flat"))
    }
}

impl fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("state", &self.state())
            .field("recovery_attempts", &self.recovery_attempts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceKind;
    use std::sync::atomic::AtomicUsize;

    /// Opener whose structured engine fails to open a configurable number of times.
    struct FlakyOpener {
        structured_failures: usize,
        flat_fails: bool,
        structured_opens: Arc<AtomicUsize>,
        inner: EphemeralOpener,
    }

    impl FlakyOpener {
        fn new(structured_failures: usize, flat_fails: bool) -> (Self, Arc<AtomicUsize>) {
            let opens = Arc::new(AtomicUsize::new(0));
            let opener = Self {
                structured_failures,
                flat_fails,
                structured_opens: opens.clone(),
                inner: EphemeralOpener::new(),
            };
            (opener, opens)
        }
    }

    impl BackendOpener for FlakyOpener {
        fn open_structured(&self, identifier: &str) -> Result<Arc<dyn StorageBackend>> {
            let n = self.structured_opens.fetch_add(1, Ordering::SeqCst);
            if n < self.structured_failures {
                return Err(Error::connection_lost("open", "database disk image is malformed"));
            }
            self.inner.open_structured(identifier)
        }

        fn open_flat(&self) -> Result<Arc<dyn StorageBackend>> {
            if self.flat_fails {
                return Err(Error::connection_lost("open_flat", "read-only file system"));
            }
            self.inner.open_flat()
        }
    }

    #[test]
    fn test_open_structured() {
        let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
        assert_eq!(supervisor.state(), SupervisorState::Uninitialized);

        let session = supervisor.open().unwrap();
        assert_eq!(session.kind(), BackendKind::Structured);
        assert_eq!(session.identifier(), DEFAULT_DATABASE_NAME);
        assert_eq!(supervisor.state(), SupervisorState::Structured);
        assert_eq!(supervisor.recovery_attempts(), 0);

        let categories = session.backend().list_references(ReferenceKind::Category).unwrap();
        assert_eq!(categories.len(), 8);
    }

    #[test]
    fn test_open_recovers_onto_fresh_identifier() {
        let (opener, opens) = FlakyOpener::new(1, false);
        let supervisor = ConnectionSupervisor::new(Box::new(opener), Language::En);

        let session = supervisor.open().unwrap();
        assert_eq!(session.kind(), BackendKind::Structured);
        assert!(session.identifier().starts_with("freshkeep-recovery-"));
        assert_eq!(supervisor.recovery_attempts(), 1);
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_open_downgrades_after_failed_recovery() {
        let (opener, opens) = FlakyOpener::new(usize::MAX, false);
        let supervisor = ConnectionSupervisor::new(Box::new(opener), Language::Fr);

        let session = supervisor.open().unwrap();
        assert_eq!(session.kind(), BackendKind::Flat);
        assert_eq!(supervisor.state(), SupervisorState::Degraded);
        assert_eq!(supervisor.recovery_attempts(), 1);

        let locations = session.backend().list_references(ReferenceKind::Location).unwrap();
        assert_eq!(locations[0].name, "Réfrigérateur");

        for _ in 0..5 {
            assert_eq!(supervisor.acquire().unwrap().kind(), BackendKind::Flat);
        }
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(supervisor.recovery_attempts(), 1);
    }

    #[test]
    fn test_backend_unavailable_when_everything_fails() {
        let (opener, _) = FlakyOpener::new(usize::MAX, true);
        let supervisor = ConnectionSupervisor::new(Box::new(opener), Language::En);

        let err = supervisor.open().unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert_eq!(supervisor.state(), SupervisorState::Uninitialized);
    }

    #[test]
    fn test_concurrent_acquire_opens_once() {
        let (opener, opens) = FlakyOpener::new(0, false);
        let supervisor = Arc::new(ConnectionSupervisor::new(Box::new(opener), Language::En));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let supervisor = supervisor.clone();
                std::thread::spawn(move || supervisor.acquire().map(|s| s.kind()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), BackendKind::Structured);
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_passes_other_errors_through() {
        let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
        let mut calls = 0;
        let err = supervisor
            .run(|_| {
                calls += 1;
                Err::<(), _>(Error::InvalidArgument("name must not be empty".into()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(calls, 1);
        assert_eq!(supervisor.recovery_attempts(), 0);
    }

    #[test]
    fn test_run_recovers_and_retries_after_statement_failure() {
        let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
        let first = supervisor.acquire().unwrap();
        assert!(supervisor.is_current(&first));

        let mut calls = 0;
        let identifier = supervisor
            .run(|session| {
                calls += 1;
                if calls == 1 {
                    return Err(Error::connection_lost("list_food_items", "disk I/O error"));
                }
                Ok(session.identifier().to_string())
            })
            .unwrap();

        assert!(identifier.starts_with("freshkeep-recovery-"));
        assert_eq!(calls, 2);
        assert_eq!(supervisor.recovery_attempts(), 1);
        assert_eq!(supervisor.state(), SupervisorState::Structured);
        assert!(!supervisor.is_current(&first));
    }

    #[test]
    fn test_language_used_for_seeding() {
        let supervisor = ConnectionSupervisor::new(Box::new(EphemeralOpener::new()), Language::En);
        supervisor.set_language(Language::Es);
        assert_eq!(supervisor.language(), Language::Es);

        let session = supervisor.acquire().unwrap();
        let dairy = session
            .backend()
            .get_reference(ReferenceKind::Category, 1)
            .unwrap()
            .unwrap();
        assert_eq!(dairy.name, "Lácteos");
    }
}
