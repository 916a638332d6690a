//! Job records and where they live: in process memory by default, in Redis
//! when `REDIS_URL` is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, ErrorReport};
use crate::output::Artifact;

const REDIS_KEY_PREFIX: &str = "tailor:job:";
/// Finished and abandoned records expire after a week.
const RECORD_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    CancelRequested,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Cancelled | JobStatus::Succeeded | JobStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub result: Option<Artifact>,
    pub error: Option<ErrorReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn pending(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves to `status`, bumping `updated_at`.
    pub fn transition(mut self, status: JobStatus) -> Self {
        self.status = status;
        self.updated_at = Utc::now();
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt job record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Job id → record. Writes replace the whole record.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;
    async fn put(&self, record: &JobRecord) -> Result<(), StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store; records vanish on restart. Finished records are
/// pruned once they are older than the retention window, matching the Redis TTL.
pub struct InMemoryJobStore {
    records: RwLock<HashMap<Uuid, JobRecord>>,
    retention: chrono::Duration,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self {
            records: RwLock::default(),
            retention: chrono::Duration::seconds(RECORD_TTL_SECS as i64),
        }
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: chrono::Duration) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn put(&self, record: &JobRecord) -> Result<(), StoreError> {
        let cutoff = Utc::now() - self.retention;
        let mut records = self.records.write().await;
        records.retain(|_, r| !(r.status.is_terminal() && r.updated_at < cutoff));
        records.insert(record.id, record.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

/// Records stored as JSON strings under `tailor:job:{id}` with a TTL.
#[derive(Clone)]
pub struct RedisJobStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisJobStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }

    fn key(id: Uuid) -> String {
        format!("{REDIS_KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.get(Self::key(id)).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn put(&self, record: &JobRecord) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let json = serde_json::to_string(record)?;
        connection
            .set_ex::<_, _, ()>(Self::key(record.id), json, RECORD_TTL_SECS)
            .await?;
        Ok(())
    }
}
