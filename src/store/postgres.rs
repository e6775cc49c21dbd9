//! PostgreSQL session store
//!
//! Stores session records in a single `comet_sessions` table with the
//! profile snapshot as a JSONB column. Connections come from a
//! deadpool-postgres pool; every operation checks affected-row counts so a
//! vanished record surfaces as [`StoreError::NotFound`] instead of a silent
//! no-op.

use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::models::{Session, SessionStatus};

use super::{SessionStore, StoreError, StoreResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS comet_sessions (
    id          UUID PRIMARY KEY,
    status      TEXT NOT NULL,
    profile     JSONB NOT NULL,
    elapsed     TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
)";

/// PostgreSQL-backed session store
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Connect to the database and ensure the sessions table exists
    pub async fn connect(url: &str, pool_size: usize) -> StoreResult<Self> {
        let mut config = PoolConfig::new();
        config.url = Some(url.to_string());
        config.pool = Some(deadpool_postgres::PoolConfig::new(pool_size));

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Backend(format!("failed to create pool: {e}")))?;

        let store = Self { pool };
        store.ensure_schema().await?;

        tracing::info!("Connected to PostgreSQL session store");
        Ok(store)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    async fn client(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to get connection: {e}")))
    }

    fn row_to_session(row: &Row) -> StoreResult<Session> {
        let status: String = row.get("status");
        let status = status
            .parse::<SessionStatus>()
            .map_err(StoreError::Backend)?;
        let profile: serde_json::Value = row.get("profile");
        let profile = serde_json::from_value(profile)
            .map_err(|e| StoreError::Backend(format!("corrupt profile column: {e}")))?;

        Ok(Session {
            id: row.get("id"),
            status,
            profile,
            elapsed: row.get("elapsed"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let client = self.client().await?;
        let profile = serde_json::to_value(&session.profile)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let params: [&(dyn ToSql + Sync); 6] = [
            &session.id,
            &session.status.as_str(),
            &profile,
            &session.elapsed,
            &session.created_at,
            &session.updated_at,
        ];
        client
            .execute(
                "INSERT INTO comet_sessions \
                 (id, status, profile, elapsed, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &params,
            )
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Session> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, status, profile, elapsed, created_at, updated_at \
                 FROM comet_sessions WHERE id = $1",
                &[&id],
            )
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::row_to_session(&row)
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        let client = self.client().await?;
        let profile = serde_json::to_value(&session.profile)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let params: [&(dyn ToSql + Sync); 5] = [
            &session.status.as_str(),
            &profile,
            &session.elapsed,
            &session.updated_at,
            &session.id,
        ];
        let affected = client
            .execute(
                "UPDATE comet_sessions \
                 SET status = $1, profile = $2, elapsed = $3, updated_at = $4 \
                 WHERE id = $5",
                &params,
            )
            .await?;
        if affected != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> StoreResult<()> {
        let client = self.client().await?;
        let affected = client
            .execute(
                "UPDATE comet_sessions SET status = $1, updated_at = $2 WHERE id = $3",
                &[&status.as_str(), &chrono::Utc::now(), &id],
            )
            .await?;
        if affected != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let client = self.client().await?;
        let affected = client
            .execute("DELETE FROM comet_sessions WHERE id = $1", &[&id])
            .await?;
        if affected != 1 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Session>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT id, status, profile, elapsed, created_at, updated_at \
                 FROM comet_sessions ORDER BY created_at",
                &[],
            )
            .await?;
        rows.iter().map(Self::row_to_session).collect()
    }
}
