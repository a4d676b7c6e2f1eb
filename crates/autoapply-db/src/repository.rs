use autoapply_core::error::AppError;
use autoapply_core::models::{ApplicationRecord, LogAction, LogEntry, PostingId};
use autoapply_core::traits::Ledger;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Applied-postings ledger and event log in SQLite.
///
/// Every method is a single autocommit statement. The inherent methods
/// return errors; the [`Ledger`] impl turns read and log failures into
/// safe defaults for the pipeline.
#[derive(Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn try_is_applied(&self, posting_id: &PostingId) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM applied WHERE posting_id = ?")
            .bind(posting_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.is_some())
    }

    /// Record a posting as applied. A second insert of the same id keeps
    /// the original timestamp.
    pub async fn insert_applied(&self, posting_id: &PostingId) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO applied (posting_id, applied_at)
            VALUES (?, ?)
            ON CONFLICT(posting_id) DO NOTHING
            "#,
        )
        .bind(posting_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn insert_log(&self, entry: &LogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO logs (posting_id, action, message, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(entry.posting_id.as_str())
        .bind(entry.action.as_str())
        .bind(&entry.message)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Log entries, newest first by insertion order.
    pub async fn fetch_recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, AppError> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT posting_id, action, message, timestamp
            FROM logs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(LogEntry::try_from).collect()
    }

    pub async fn count_applied(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM applied")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count.max(0) as u64)
    }

    /// Most recently applied postings first.
    pub async fn fetch_applied(&self, limit: usize) -> Result<Vec<ApplicationRecord>, AppError> {
        let rows = sqlx::query_as::<_, AppliedRow>(
            r#"
            SELECT posting_id, applied_at
            FROM applied
            ORDER BY applied_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct LogRow {
    posting_id: String,
    action: String,
    message: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = AppError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let action: LogAction = row.action.parse().map_err(AppError::DatabaseError)?;
        Ok(LogEntry {
            posting_id: PostingId::from(row.posting_id),
            action,
            message: row.message,
            timestamp: row.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AppliedRow {
    posting_id: String,
    applied_at: DateTime<Utc>,
}

impl From<AppliedRow> for ApplicationRecord {
    fn from(row: AppliedRow) -> Self {
        ApplicationRecord {
            posting_id: PostingId::from(row.posting_id),
            applied_at: row.applied_at,
        }
    }
}

// -- Trait implementation --

impl Ledger for LedgerRepository {
    async fn is_applied(&self, posting_id: &PostingId) -> bool {
        match self.try_is_applied(posting_id).await {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(%posting_id, error = %e, "Ledger lookup failed, treating as not applied");
                false
            }
        }
    }

    async fn mark_applied(&self, posting_id: &PostingId) -> Result<(), AppError> {
        self.insert_applied(posting_id).await
    }

    async fn append_log(&self, entry: &LogEntry) {
        if let Err(e) = self.insert_log(entry).await {
            tracing::error!(
                posting_id = %entry.posting_id,
                action = %entry.action,
                error = %e,
                "Failed to append log entry"
            );
        }
    }

    async fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.fetch_recent_logs(limit).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read recent logs");
            Vec::new()
        })
    }

    async fn applied_count(&self) -> u64 {
        self.count_applied().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to count applied postings");
            0
        })
    }
}
