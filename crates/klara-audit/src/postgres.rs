use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::info;

use crate::{AuditEntry, AuditSink};

/// Postgres-backed audit sink.
///
/// The destination table is created lazily on first use when
/// `auto_create_table` allows it. The table name is selected per
/// environment (`klara_chat_log_dev` / `klara_chat_log_prod`), so it is
/// interpolated into SQL and must pass a charset guard.
pub struct PostgresAuditSink {
    pool: PgPool,
    table: String,
    auto_create_table: bool,
    ensured: OnceCell<()>,
}

impl PostgresAuditSink {
    pub async fn connect(
        database_url: &str,
        environment: &str,
        auto_create_table: bool,
    ) -> Result<Self> {
        let table = table_name(environment)?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to audit database")?;

        info!(table = %table, "Connected to audit database");
        Ok(Self {
            pool,
            table,
            auto_create_table,
            ensured: OnceCell::new(),
        })
    }

    async fn ensure_table(&self) -> Result<()> {
        self.ensured
            .get_or_try_init(|| async {
                if !self.auto_create_table {
                    return Ok(());
                }
                let ddl = format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id BIGSERIAL PRIMARY KEY,
                        conversation_id TEXT,
                        user_id TEXT NOT NULL,
                        query TEXT NOT NULL,
                        response TEXT NOT NULL,
                        status TEXT NOT NULL,
                        response_time_ms BIGINT NOT NULL,
                        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                    )",
                    table = self.table
                );
                sqlx::query(&ddl).execute(&self.pool).await?;

                for column in ["user_id", "created_at"] {
                    let index = format!(
                        "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})",
                        table = self.table,
                        column = column
                    );
                    sqlx::query(&index).execute(&self.pool).await?;
                }

                info!(table = %self.table, "Audit table ready");
                Ok::<(), anyhow::Error>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.ensure_table().await?;

        let sql = format!(
            "INSERT INTO {table}
                (conversation_id, user_id, query, response, status, response_time_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            table = self.table
        );
        sqlx::query(&sql)
            .bind(&entry.conversation_id)
            .bind(&entry.user_id)
            .bind(&entry.query)
            .bind(&entry.response)
            .bind(&entry.status)
            .bind(entry.response_time_ms)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .context("Audit insert failed")?;
        Ok(())
    }
}

fn table_name(environment: &str) -> Result<String> {
    let env = environment.trim().to_lowercase();
    if env.is_empty() || !env.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Invalid audit environment name: {environment:?}");
    }
    Ok(format!("klara_chat_log_{env}"))
}
