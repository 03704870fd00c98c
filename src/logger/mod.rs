//! Logging service: the persistence side of the relay.
//!
//! Payloads arrive either as JSON `POST /log` ([`http`]) or as the
//! `LogInfo` RPC ([`rpc`]) and are written to a [`LogRepository`]. Every
//! repository call is bounded by the configured persistence timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::payload::Payload;

pub mod http;
pub mod rpc;

/// Errors raised by a log repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Persistence timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A persisted log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub name: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for log entries.
///
/// The repository assigns identifiers and timestamps.
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn insert(&self, payload: Payload) -> Result<LogEntry, RepositoryError>;

    /// All entries, newest first.
    async fn all(&self) -> Result<Vec<LogEntry>, RepositoryError>;
}

/// In-memory repository.
#[derive(Default)]
pub struct InMemoryLogRepository {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl LogRepository for InMemoryLogRepository {
    async fn insert(&self, payload: Payload) -> Result<LogEntry, RepositoryError> {
        let now = Utc::now();
        let entry = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: payload.name,
            data: payload.data,
            created_at: now,
            updated_at: now,
        };

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn all(&self) -> Result<Vec<LogEntry>, RepositoryError> {
        let mut entries = self.entries.read().await.clone();
        // Insertion order is chronological.
        entries.reverse();
        Ok(entries)
    }
}

/// Run a repository operation under `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| RepositoryError::Timeout(timeout))?
}

/// Logging service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Port for `POST /log`.
    pub http_port: u16,
    /// Port for the `LogInfo` gRPC service.
    pub grpc_port: u16,
    /// Upper bound for each persistence operation, in seconds.
    pub persistence_timeout_secs: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            grpc_port: 50001,
            persistence_timeout_secs: 15,
        }
    }
}

impl LoggerConfig {
    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_secs(self.persistence_timeout_secs)
    }
}
