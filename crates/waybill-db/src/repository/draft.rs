//! # Draft Repository
//!
//! Drafts are stored as one JSON document per row. The invoice number is
//! copied into its own column so draft lists can show it without parsing.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use waybill_core::{Draft, DraftData};

#[derive(Debug, sqlx::FromRow)]
struct DraftRow {
    id: String,
    draft_data: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DraftRow {
    fn into_draft(self) -> DbResult<Draft> {
        let data = DraftData::from_json(&self.draft_data).map_err(|e| {
            DbError::Serialization(format!("draft {}: {}", self.id, e))
        })?;
        Ok(Draft {
            id: self.id,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for draft database operations.
#[derive(Debug, Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DraftRepository { pool }
    }

    /// Upserts a draft keyed by its own id.
    ///
    /// `id = None` creates a new draft with a fresh id. Saving the same
    /// id again replaces the snapshot and keeps `created_at`.
    pub async fn save(&self, id: Option<&str>, data: &DraftData) -> DbResult<Draft> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let json = serde_json::to_string(data)?;
        let label = data.header.invoice_number.trim();
        let label = (!label.is_empty()).then_some(label);
        let now = Utc::now();

        debug!(draft_id = %id, invoice_number = ?label, "Saving draft");

        sqlx::query(
            r#"
            INSERT INTO drafts (id, invoice_number, draft_data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                invoice_number = excluded.invoice_number,
                draft_data = excluded.draft_data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(label)
        .bind(&json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Draft", id))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Draft>> {
        let row: Option<DraftRow> = sqlx::query_as(
            "SELECT id, draft_data, created_at, updated_at FROM drafts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DraftRow::into_draft).transpose()
    }

    /// Lists drafts, most recently updated first.
    ///
    /// Rows whose snapshot cannot be parsed are logged and left out; they
    /// stay in the table and can still be deleted by id.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Draft>> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            r#"
            SELECT id, draft_data, created_at, updated_at
            FROM drafts
            ORDER BY updated_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut drafts = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match row.into_draft() {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!(draft_id = %id, error = %e, "Skipping unreadable draft"),
            }
        }
        Ok(drafts)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(draft_id = %id, "Deleting draft");

        let result = sqlx::query("DELETE FROM drafts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Draft", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drafts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use waybill_core::ShipmentHeader;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_is_idempotent_upsert() {
        let db = setup().await;
        let repo = db.drafts();

        let mut data = DraftData::default();
        data.header = ShipmentHeader::new("KS1001", "", "");
        let first = repo.save(None, &data).await.unwrap();

        data.header.shipper = "Andes Flowers".into();
        data.current_step = 2;
        let second = repo.save(Some(&first.id), &data).await.unwrap();
        let third = repo.save(Some(&first.id), &data).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(third.created_at, first.created_at);
        assert_eq!(third.data.header.shipper, "Andes Flowers");
        assert_eq!(third.data.current_step, 2);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_legacy_row_is_readable() {
        let db = setup().await;
        sqlx::query(
            "INSERT INTO drafts (id, invoice_number, draft_data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind("legacy")
        .bind("ks9")
        .bind(r#"{"invoiceNumber":"ks9","boxes":[{"boxNumber":"3","products":[{"weight":"1.5","rate":"2"}]}]}"#)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let draft = db.drafts().get("legacy").await.unwrap().unwrap();
        assert_eq!(draft.label(), Some("ks9"));
        assert_eq!(draft.data.boxes[0].box_number, 1);
        assert_eq!(draft.data.boxes[0].products[0].weight.grams(), 1500);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_rows() {
        let db = setup().await;
        let repo = db.drafts();
        let good = repo.save(None, &DraftData::default()).await.unwrap();
        sqlx::query(
            "INSERT INTO drafts (id, invoice_number, draft_data, created_at, updated_at) VALUES (?1, NULL, ?2, ?3, ?3)",
        )
        .bind("broken")
        .bind("{not json")
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();

        let drafts = repo.list(10).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, good.id);

        assert!(matches!(repo.get("broken").await, Err(DbError::Serialization(_))));
        repo.delete("broken").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = setup().await;
        let repo = db.drafts();
        let a = repo.save(None, &DraftData::default()).await.unwrap();
        repo.save(None, &DraftData::default()).await.unwrap();

        assert_eq!(repo.list(10).await.unwrap().len(), 2);
        repo.delete(&a.id).await.unwrap();
        assert_eq!(repo.list(10).await.unwrap().len(), 1);
        assert!(matches!(repo.delete(&a.id).await, Err(DbError::NotFound { .. })));
    }
}
