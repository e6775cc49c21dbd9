//! Durable session storage
//!
//! [`SessionStore`] is the boundary the orchestrator and watchdog persist
//! through. Two backends ship with the crate: [`MemoryStore`] for tests and
//! driverless development, and a PostgreSQL implementation in
//! [`postgres`].
//!
//! Each session record has exactly one writer (its watchdog) for its
//! lifetime, so the store contract requires no cross-record coordination.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Session, SessionStatus};

pub mod postgres;

pub use postgres::PostgresStore;

/// Errors from a session store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with the requested ID
    #[error("session not found")]
    NotFound,

    /// Backend failure (connection, query, serialization)
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable store contract for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new record. The caller owns ID allocation.
    async fn create(&self, session: &Session) -> StoreResult<()>;

    /// Fetch one record by ID
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Session>;

    /// Replace the stored record (status, profile, elapsed, updated_at)
    async fn update(&self, session: &Session) -> StoreResult<()>;

    /// Update only the status and touch updated_at
    async fn update_status(&self, id: Uuid, status: SessionStatus) -> StoreResult<()>;

    /// Remove one record
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Fetch all records, oldest first
    async fn fetch_all(&self) -> StoreResult<Vec<Session>>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store backed by a `HashMap`
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(existing) => {
                existing.status = status;
                existing.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        Ok(all)
    }
}
