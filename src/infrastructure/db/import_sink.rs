use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::batch::StorageRecord;
use crate::domain::csv::is_sql_identifier;
use crate::domain::error::{AppError, Result};

/// Why a single insert did not land
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// This row was rejected; the rest of the run can continue
    #[error("row rejected: {0}")]
    Row(String),

    /// The store itself is gone; nothing further can be written
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage boundary: one durable row per call
#[async_trait]
pub trait ImportSink {
    async fn insert(&self, record: &StorageRecord) -> std::result::Result<(), SinkError>;
}

/// Inserts rows into one SQLite table, each in its own implicit transaction
pub struct SqliteImportSink {
    pool: SqlitePool,
    table: String,
}

impl SqliteImportSink {
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_sql_identifier(&table) {
            return Err(AppError::ValidationError(format!(
                "Table name '{}' is not a valid identifier",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the target table with one text column per target field
    pub async fn ensure_table(&self, columns: &[&str]) -> Result<()> {
        if let Some(bad) = columns.iter().find(|c| !is_sql_identifier(c)) {
            return Err(AppError::ValidationError(format!(
                "Column name '{}' is not a valid identifier",
                bad
            )));
        }

        let column_defs = columns
            .iter()
            .map(|c| format!("\"{}\" TEXT NOT NULL", c))
            .collect::<Vec<_>>()
            .join(",\n                ");

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                {},
                imported_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            self.table, column_defs
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to create table: {}", e)))?;

        info!(table = %self.table, "Import table ready");
        Ok(())
    }

    pub async fn count_rows(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to count rows: {}", e)))
    }

    fn insert_sql(&self, record: &StorageRecord) -> std::result::Result<String, SinkError> {
        if record.is_empty() {
            return Err(SinkError::Row("record has no columns".to_string()));
        }
        if let Some(bad) = record.columns().find(|c| !is_sql_identifier(c)) {
            return Err(SinkError::Row(format!("invalid column name '{}'", bad)));
        }

        let columns = record
            .columns()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; record.len()].join(", ");

        Ok(format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table, columns, placeholders
        ))
    }
}

#[async_trait]
impl ImportSink for SqliteImportSink {
    async fn insert(&self, record: &StorageRecord) -> std::result::Result<(), SinkError> {
        let sql = self.insert_sql(record)?;

        let mut query = sqlx::query(&sql);
        for value in record.values() {
            query = query.bind(value.to_string());
        }

        let result = query.execute(&self.pool).await.map_err(classify_error)?;
        debug!(
            table = %self.table,
            row_id = result.last_insert_rowid(),
            "Inserted imported row"
        );
        Ok(())
    }
}

/// Split sqlx failures into row-scoped and run-scoped errors
fn classify_error(err: sqlx::Error) -> SinkError {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLite reports extended result codes; the low byte is the primary code
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);

            match primary {
                // BUSY, LOCKED, NOMEM, READONLY, IOERR, CORRUPT, FULL, CANTOPEN, NOTADB
                Some(5) | Some(6) | Some(7) | Some(8) | Some(10) | Some(11) | Some(13)
                | Some(14) | Some(26) => SinkError::Unavailable(db_err.to_string()),
                _ => SinkError::Row(db_err.to_string()),
            }
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => SinkError::Unavailable(err.to_string()),
        other => SinkError::Row(other.to_string()),
    }
}
