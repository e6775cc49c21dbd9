//! Progress watchdog: the single writer for one session's record
//!
//! Every progress event the worker emits flows through here before it
//! touches the store, and the time budget is enforced here too. Holding both
//! responsibilities in one task means a timeout and a progress write can
//! never race on the same record.
//!
//! The watchdog ends when the progress channel closes (worker finished), the
//! budget elapses, or process shutdown is requested. On timeout it assigns
//! `TimedOut` and cancels the worker so the browser session actually stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::OptionalCache;
use crate::models::{ProgressEvent, Session, SessionStatus};
use crate::store::{SessionStore, StoreError};

/// Supervises one crawl worker against a wall-clock budget
pub struct Watchdog {
    store: Arc<dyn SessionStore>,
    cache: Arc<OptionalCache>,
    budget: Duration,
}

impl Watchdog {
    pub fn new(store: Arc<dyn SessionStore>, cache: Arc<OptionalCache>, budget: Duration) -> Self {
        Self { store, cache, budget }
    }

    /// Supervise until the worker completes, the budget elapses, or shutdown.
    ///
    /// The deadline is armed once, at supervision start, and is not reset by
    /// progress. Dropping `rx` on return unblocks nothing (the worker holds
    /// the sender and tolerates a closed channel).
    pub async fn run(
        self,
        session_id: Uuid,
        mut rx: mpsc::Receiver<ProgressEvent>,
        worker_cancel: CancellationToken,
        shutdown: CancellationToken,
    ) {
        let deadline = tokio::time::sleep(self.budget);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => {
                    tracing::warn!(
                        %session_id,
                        budget_secs = self.budget.as_secs(),
                        "session exceeded time budget"
                    );
                    self.mark(session_id, SessionStatus::TimedOut).await;
                    worker_cancel.cancel();
                    break;
                }
                () = shutdown.cancelled() => {
                    tracing::info!(%session_id, "shutdown requested, abandoning session");
                    self.mark(session_id, SessionStatus::InfraFailure).await;
                    worker_cancel.cancel();
                    break;
                }
                event = rx.recv() => {
                    match event {
                        Some(event) => self.record(event).await,
                        // Channel closed: the worker is done and its last
                        // event has already been recorded.
                        None => {
                            tracing::debug!(%session_id, "worker completed, watchdog exiting");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Merge one progress event into the stored record
    async fn record(&self, event: ProgressEvent) {
        tracing::info!(
            session_id = %event.session_id,
            status = %event.status,
            elapsed = %event.elapsed,
            "session progress"
        );

        let result = match self.store.get_by_id(event.session_id).await {
            Ok(mut session) => {
                session.apply(&event);
                self.store.update(&session).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!(
                session_id = %event.session_id,
                error = %e,
                "failed to persist progress event"
            );
            return;
        }
        self.cache.invalidate_session_list().await;
    }

    /// Force a terminal status from outside the worker. A missing record is
    /// recreated with that status so the outcome is never lost. A record
    /// that already carries a terminal status is left untouched; the worker's
    /// final event may have been persisted in the same select round the
    /// deadline fired in.
    async fn mark(&self, session_id: Uuid, status: SessionStatus) {
        let result = match self.store.get_by_id(session_id).await {
            Ok(session) if session.status.is_terminal() => {
                tracing::debug!(
                    %session_id,
                    stored = %session.status,
                    "session already terminal, not overwriting"
                );
                return;
            }
            Ok(_) => self.store.update_status(session_id, status).await,
            Err(StoreError::NotFound) => {
                let mut session = Session::new(session_id);
                session.status = status;
                self.store.create(&session).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!(%session_id, %status, error = %e, "failed to mark session");
            return;
        }
        self.cache.invalidate_session_list().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;
    use crate::store::MemoryStore;

    fn fixture() -> (Arc<MemoryStore>, Watchdog) {
        let store = Arc::new(MemoryStore::new());
        let watchdog = Watchdog::new(
            store.clone(),
            Arc::new(OptionalCache::disabled()),
            Duration::from_secs(5),
        );
        (store, watchdog)
    }

    fn event(session_id: Uuid, status: SessionStatus) -> ProgressEvent {
        ProgressEvent {
            session_id,
            status,
            profile: Profile::default(),
            elapsed: "1.0s".to_string(),
        }
    }

    #[tokio::test]
    async fn test_progress_events_merge_into_record() {
        let (store, watchdog) = fixture();
        let session = Session::new(Uuid::new_v4());
        store.create(&session).await.unwrap();

        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(watchdog.run(
            session.id,
            rx,
            CancellationToken::new(),
            CancellationToken::new(),
        ));

        tx.send(event(session.id, SessionStatus::LoggedIn))
            .await
            .unwrap();
        tx.send(event(session.id, SessionStatus::Succeeded))
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        let loaded = store.get_by_id(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::Succeeded);
        assert_eq!(loaded.elapsed, "1.0s");
    }

    #[tokio::test]
    async fn test_timeout_marks_record_and_cancels_worker() {
        let store = Arc::new(MemoryStore::new());
        let watchdog = Watchdog::new(
            store.clone(),
            Arc::new(OptionalCache::disabled()),
            Duration::from_millis(20),
        );
        let session = Session::new(Uuid::new_v4());
        store.create(&session).await.unwrap();

        let (tx, rx) = mpsc::channel::<ProgressEvent>(1);
        let worker_cancel = CancellationToken::new();
        let handle = tokio::spawn(watchdog.run(
            session.id,
            rx,
            worker_cancel.clone(),
            CancellationToken::new(),
        ));

        // Hold the sender open so the channel never closes; only the
        // deadline can end supervision.
        handle.await.unwrap();
        drop(tx);

        assert!(worker_cancel.is_cancelled());
        let loaded = store.get_by_id(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_timeout_never_overwrites_terminal_status() {
        let store = Arc::new(MemoryStore::new());
        let watchdog = Watchdog::new(
            store.clone(),
            Arc::new(OptionalCache::disabled()),
            Duration::from_millis(20),
        );
        let mut session = Session::new(Uuid::new_v4());
        session.status = SessionStatus::Succeeded;
        store.create(&session).await.unwrap();

        // Sender stays open, so only the deadline ends supervision.
        let (_tx, rx) = mpsc::channel::<ProgressEvent>(1);
        tokio::spawn(watchdog.run(
            session.id,
            rx,
            CancellationToken::new(),
            CancellationToken::new(),
        ))
        .await
        .unwrap();

        let loaded = store.get_by_id(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_timeout_recreates_missing_record() {
        let store = Arc::new(MemoryStore::new());
        let watchdog = Watchdog::new(
            store.clone(),
            Arc::new(OptionalCache::disabled()),
            Duration::from_millis(20),
        );
        let session_id = Uuid::new_v4();

        let (_tx, rx) = mpsc::channel::<ProgressEvent>(1);
        tokio::spawn(watchdog.run(
            session_id,
            rx,
            CancellationToken::new(),
            CancellationToken::new(),
        ))
        .await
        .unwrap();

        let loaded = store.get_by_id(session_id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_completion_exits_without_status_change() {
        let (store, watchdog) = fixture();
        let session = Session::new(Uuid::new_v4());
        store.create(&session).await.unwrap();

        let worker_cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<ProgressEvent>(1);
        drop(tx);

        watchdog
            .run(
                session.id,
                rx,
                worker_cancel.clone(),
                CancellationToken::new(),
            )
            .await;

        assert!(!worker_cancel.is_cancelled());
        let loaded = store.get_by_id(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::Start);
    }

    #[tokio::test]
    async fn test_shutdown_marks_infra_failure() {
        let (store, watchdog) = fixture();
        let session = Session::new(Uuid::new_v4());
        store.create(&session).await.unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let worker_cancel = CancellationToken::new();
        let (_tx, rx) = mpsc::channel::<ProgressEvent>(1);

        watchdog
            .run(session.id, rx, worker_cancel.clone(), shutdown)
            .await;

        assert!(worker_cancel.is_cancelled());
        let loaded = store.get_by_id(session.id).await.unwrap();
        assert_eq!(loaded.status, SessionStatus::InfraFailure);
    }
}
