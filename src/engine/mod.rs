//! Session orchestration
//!
//! [`SessionEngine`] owns the store, cache, selector schema and driver
//! factory, and wires one worker/watchdog pair per started session. Starting
//! a session is synchronous only up to the initial `Start` record; the crawl
//! itself runs on detached tasks and the caller polls the record for
//! progress.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::OptionalCache;
use crate::driver::DriverFactory;
use crate::error::Result;
use crate::models::{format_elapsed, Credentials, Profile, ProgressEvent, Session, SessionStatus};
use crate::selectors::SelectorSchema;
use crate::store::SessionStore;
use crate::watchdog::Watchdog;
use crate::worker::CrawlWorker;

/// Default wall-clock budget per session
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(80);

/// Orchestrates scrape sessions end to end
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    cache: Arc<OptionalCache>,
    schema: Arc<SelectorSchema>,
    drivers: Arc<dyn DriverFactory>,
    budget: Duration,
    shutdown: CancellationToken,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cache: Arc<OptionalCache>,
        schema: Arc<SelectorSchema>,
        drivers: Arc<dyn DriverFactory>,
        budget: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            cache,
            schema,
            drivers,
            budget,
            shutdown,
        }
    }

    /// Start a new scrape session and return its ID immediately.
    ///
    /// The `Start` record is persisted before this returns; a create failure
    /// surfaces here and no tasks are spawned. Everything after that is
    /// reported through the record, never through this call.
    pub async fn start_session(&self, credentials: Credentials) -> Result<Uuid> {
        let session_id = Uuid::new_v4();
        let session = Session::new(session_id);
        self.store.create(&session).await?;
        self.cache.invalidate_session_list().await;

        tracing::info!(%session_id, "session started");

        let (tx, rx) = mpsc::channel(1);
        let worker_cancel = CancellationToken::new();

        let drivers = self.drivers.clone();
        let schema = self.schema.clone();
        let cancel = worker_cancel.clone();
        tokio::spawn(async move {
            match drivers.create().await {
                Ok(driver) => {
                    CrawlWorker::new(driver, schema)
                        .run(session_id, credentials, tx, cancel)
                        .await;
                }
                Err(e) => {
                    tracing::error!(%session_id, error = %e, "failed to create page driver");
                    let event = ProgressEvent {
                        session_id,
                        status: SessionStatus::InfraFailure,
                        profile: Profile::default(),
                        elapsed: format_elapsed(Duration::ZERO),
                    };
                    let _ = tx.send(event).await;
                }
            }
        });

        let watchdog = Watchdog::new(self.store.clone(), self.cache.clone(), self.budget);
        tokio::spawn(watchdog.run(
            session_id,
            rx,
            worker_cancel,
            self.shutdown.child_token(),
        ));

        Ok(session_id)
    }

    /// Fetch one session record
    pub async fn get_session(&self, id: Uuid) -> Result<Session> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// List all session records, oldest first, via the cache when warm
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        if let Some(sessions) = self.cache.get_session_list().await {
            tracing::debug!(count = sessions.len(), "session list served from cache");
            return Ok(sessions);
        }

        let sessions = self.store.fetch_all().await?;
        self.cache.set_session_list(&sessions).await;
        Ok(sessions)
    }

    /// Delete one session record
    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        self.store.delete(id).await?;
        self.cache.invalidate_session_list().await;
        tracing::info!(session_id = %id, "session deleted");
        Ok(())
    }

    /// True once shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("budget", &self.budget)
            .field("cache_available", &self.cache.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NullDriverFactory;
    use crate::error::Error;
    use crate::store::MemoryStore;

    fn engine() -> SessionEngine {
        SessionEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(OptionalCache::disabled()),
            Arc::new(crate::selectors::fixtures::schema()),
            Arc::new(NullDriverFactory),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_session_persists_start_record() {
        let engine = engine();
        let id = engine.start_session(credentials()).await.unwrap();

        let session = engine.get_session(id).await.unwrap();
        assert_eq!(session.id, id);
        // The record exists before any worker progress lands.
        assert!(
            session.status == SessionStatus::Start
                || session.status == SessionStatus::InfraFailure
        );
    }

    #[tokio::test]
    async fn test_null_driver_ends_in_infra_failure() {
        let engine = engine();
        let id = engine.start_session(credentials()).await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let session = engine.get_session(id).await.unwrap();
            if session.status.is_terminal() {
                assert_eq!(session.status, SessionStatus::InfraFailure);
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "session never terminal");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let engine = engine();
        let err = engine.get_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let engine = engine();
        let id = engine.start_session(credentials()).await.unwrap();

        engine.delete_session(id).await.unwrap();
        let err = engine.get_session(id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn test_delete_missing_session_is_not_found() {
        let engine = engine();
        let err = engine.delete_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn test_list_sessions_ordered() {
        let engine = engine();
        let first = engine.start_session(credentials()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = engine.start_session(credentials()).await.unwrap();

        let sessions = engine.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, first);
        assert_eq!(sessions[1].id, second);
    }
}
