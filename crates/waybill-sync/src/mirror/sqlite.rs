//! # SQLite Mirror
//!
//! A second SQLite file used as the remote copy, for sites that back up to
//! a mounted drive or network share instead of a server.
//!
//! ```text
//! mirror_records
//! ┌───────────┬──────────────┬──────────────┬─────────────┐
//! │ class     │ natural_key  │ payload      │ uploaded_at │
//! ├───────────┼──────────────┼──────────────┼─────────────┤
//! │ shipments │ KS1001       │ {...json...} │ 2026-...    │
//! │ shippers  │ andes flowers│ {...json...} │ 2026-...    │
//! └───────────┴──────────────┴──────────────┴─────────────┘
//!   PRIMARY KEY (class, natural_key)
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use waybill_core::EntityClass;

use super::{MirrorRecord, RemoteMirror};
use crate::error::{MirrorError, MirrorResult};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mirror_records (
    class        TEXT NOT NULL,
    natural_key  TEXT NOT NULL,
    payload      TEXT NOT NULL,
    uploaded_at  TEXT NOT NULL,
    PRIMARY KEY (class, natural_key)
)
"#;

/// File-backed mirror.
#[derive(Debug, Clone)]
pub struct SqliteMirror {
    pool: SqlitePool,
    location: PathBuf,
}

impl SqliteMirror {
    /// Opens (creating if needed) the mirror file.
    pub async fn open(path: &Path) -> MirrorResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;
        Self::init(pool, path.to_path_buf()).await
    }

    /// Private in-memory mirror (tests, dry runs).
    pub async fn in_memory() -> MirrorResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool, PathBuf::from(":memory:")).await
    }

    async fn init(pool: SqlitePool, location: PathBuf) -> MirrorResult<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(SqliteMirror { pool, location })
    }

    /// Stored document for one key.
    pub async fn payload(&self, class: EntityClass, key: &str) -> MirrorResult<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT payload FROM mirror_records WHERE class = ?1 AND natural_key = ?2",
        )
        .bind(class.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|s| serde_json::from_str(&s).map_err(MirrorError::from))
            .transpose()
    }
}

#[async_trait]
impl RemoteMirror for SqliteMirror {
    fn describe(&self) -> String {
        format!("sqlite {}", self.location.display())
    }

    async fn count(&self, class: EntityClass) -> MirrorResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mirror_records WHERE class = ?1")
            .bind(class.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn keys(&self, class: EntityClass) -> MirrorResult<HashSet<String>> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT natural_key FROM mirror_records WHERE class = ?1")
                .bind(class.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(keys.into_iter().collect())
    }

    /// Writes the whole batch in one transaction.
    async fn upsert(&self, class: EntityClass, records: &[MirrorRecord]) -> MirrorResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO mirror_records (class, natural_key, payload, uploaded_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (class, natural_key) DO UPDATE SET
                    payload = excluded.payload,
                    uploaded_at = excluded.uploaded_at
                "#,
            )
            .bind(class.as_str())
            .bind(&record.key)
            .bind(record.payload.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(class = %class, records = records.len(), "Mirrored batch");
        Ok(records.len() as u64)
    }
}
