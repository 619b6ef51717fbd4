pub mod postgres;

pub use postgres::PostgresAuditSink;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One query/response exchange, recorded for analytics and debugging.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub conversation_id: Option<String>,
    pub user_id: String,
    pub query: String,
    pub response: String,
    /// "success" for upstream answers, "fallback" for canned ones.
    pub status: String,
    pub response_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Trait for audit-log backends.
///
/// Recording is observability, not correctness: callers spawn `record` as
/// a fire-and-forget task and only log failures.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Sink used when audit logging is disabled by configuration.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _entry: AuditEntry) -> Result<()> {
        Ok(())
    }
}
