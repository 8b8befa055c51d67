//! # Master Data Repository
//!
//! Shippers, consignees, product types and flower types share one table,
//! discriminated by `kind`. Within a kind, a record is identified by its
//! case-folded name (`name_key`), which is also the key the remote mirror
//! deduplicates on.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use waybill_core::validation::{normalize_name, validate_master_record};
use waybill_core::{ChangeAction, CoreError, MasterDataKind, MasterRecord};

#[derive(Debug, sqlx::FromRow)]
struct MasterRow {
    id: String,
    kind: MasterDataKind,
    name: String,
    address: Option<String>,
    contact: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MasterRow> for MasterRecord {
    fn from(row: MasterRow) -> Self {
        MasterRecord {
            id: row.id,
            kind: row.kind,
            name: row.name,
            address: row.address,
            contact: row.contact,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MASTER_COLUMNS: &str =
    "id, kind, name, address, contact, description, created_at, updated_at";

/// Repository for master data operations.
#[derive(Debug, Clone)]
pub struct MasterDataRepository {
    pool: SqlitePool,
}

impl MasterDataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MasterDataRepository { pool }
    }

    /// Creates or updates a record.
    ///
    /// ## Matching
    /// 1. a row with the record's `id` → update (the name may change)
    /// 2. a row of the same kind with the same name key → update
    /// 3. otherwise → insert
    pub async fn upsert(&self, record: &MasterRecord) -> DbResult<(MasterRecord, ChangeAction)> {
        validate_master_record(record).map_err(CoreError::from)?;

        let name = record.name.trim();
        let name_key = normalize_name(name);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let by_id: Option<String> = if record.id.is_empty() {
            None
        } else {
            sqlx::query_scalar("SELECT id FROM master_data WHERE id = ?1 AND kind = ?2")
                .bind(&record.id)
                .bind(record.kind)
                .fetch_optional(&mut *tx)
                .await?
        };
        let existing = match by_id {
            Some(id) => Some(id),
            None => {
                sqlx::query_scalar("SELECT id FROM master_data WHERE kind = ?1 AND name_key = ?2")
                    .bind(record.kind)
                    .bind(&name_key)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        let (id, action) = match existing {
            Some(id) => {
                debug!(kind = %record.kind, name = %name, "Updating master record");
                sqlx::query(
                    r#"
                    UPDATE master_data SET
                        name = ?2, name_key = ?3, address = ?4, contact = ?5,
                        description = ?6, updated_at = ?7
                    WHERE id = ?1
                    "#,
                )
                .bind(&id)
                .bind(name)
                .bind(&name_key)
                .bind(&record.address)
                .bind(&record.contact)
                .bind(&record.description)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                (id, ChangeAction::Updated)
            }
            None => {
                let id = if record.id.is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    record.id.clone()
                };
                debug!(kind = %record.kind, name = %name, "Inserting master record");
                sqlx::query(
                    r#"
                    INSERT INTO master_data (
                        id, kind, name, name_key, address, contact, description,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )
                .bind(&id)
                .bind(record.kind)
                .bind(name)
                .bind(&name_key)
                .bind(&record.address)
                .bind(&record.contact)
                .bind(&record.description)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                (id, ChangeAction::Created)
            }
        };

        let row: MasterRow =
            sqlx::query_as(&format!("SELECT {MASTER_COLUMNS} FROM master_data WHERE id = ?1"))
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        Ok((row.into(), action))
    }

    /// Looks a record up by kind and (case-insensitive) name.
    pub async fn get(&self, kind: MasterDataKind, name: &str) -> DbResult<Option<MasterRecord>> {
        let row: Option<MasterRow> = sqlx::query_as(&format!(
            "SELECT {MASTER_COLUMNS} FROM master_data WHERE kind = ?1 AND name_key = ?2"
        ))
        .bind(kind)
        .bind(normalize_name(name))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// All records of a kind, ordered by name.
    pub async fn list(&self, kind: MasterDataKind) -> DbResult<Vec<MasterRecord>> {
        let rows: Vec<MasterRow> = sqlx::query_as(&format!(
            "SELECT {MASTER_COLUMNS} FROM master_data WHERE kind = ?1 ORDER BY name_key"
        ))
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Natural keys of every record of a kind.
    pub async fn name_keys(&self, kind: MasterDataKind) -> DbResult<Vec<String>> {
        let keys = sqlx::query_scalar("SELECT name_key FROM master_data WHERE kind = ?1 ORDER BY name_key")
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    /// Deletes by kind and name, returning the removed record.
    pub async fn delete(&self, kind: MasterDataKind, name: &str) -> DbResult<MasterRecord> {
        let record = self
            .get(kind, name)
            .await?
            .ok_or_else(|| DbError::not_found(kind.as_str(), name))?;

        debug!(kind = %kind, name = %record.name, "Deleting master record");
        sqlx::query("DELETE FROM master_data WHERE id = ?1")
            .bind(&record.id)
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    /// Record count per kind; kinds with no records are reported as 0.
    pub async fn count_by_kind(&self) -> DbResult<Vec<(MasterDataKind, u64)>> {
        let rows: Vec<(MasterDataKind, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM master_data GROUP BY kind")
                .fetch_all(&self.pool)
                .await?;

        Ok(MasterDataKind::ALL
            .iter()
            .map(|kind| {
                let count = rows
                    .iter()
                    .find(|(k, _)| k == kind)
                    .map(|(_, c)| *c as u64)
                    .unwrap_or(0);
                (*kind, count)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_by_name_key() {
        let db = setup().await;
        let repo = db.master_data();

        let (created, action) = repo
            .upsert(&MasterRecord::new(MasterDataKind::Shipper, "Andes Flowers"))
            .await
            .unwrap();
        assert_eq!(action, ChangeAction::Created);

        let mut again = MasterRecord::new(MasterDataKind::Shipper, "ANDES  flowers");
        again.address = Some("Quito".into());
        let (updated, action) = repo.upsert(&again).await.unwrap();
        assert_eq!(action, ChangeAction::Updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.address.as_deref(), Some("Quito"));

        assert_eq!(repo.list(MasterDataKind::Shipper).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_by_id() {
        let db = setup().await;
        let repo = db.master_data();
        let (mut record, _) = repo
            .upsert(&MasterRecord::new(MasterDataKind::FlowerType, "Freedom"))
            .await
            .unwrap();

        record.name = "Freedom Red".into();
        let (renamed, action) = repo.upsert(&record).await.unwrap();
        assert_eq!(action, ChangeAction::Updated);
        assert_eq!(renamed.id, record.id);
        assert!(repo.get(MasterDataKind::FlowerType, "freedom").await.unwrap().is_none());
        assert!(repo.get(MasterDataKind::FlowerType, "freedom red").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_same_name_different_kind() {
        let db = setup().await;
        let repo = db.master_data();
        repo.upsert(&MasterRecord::new(MasterDataKind::Shipper, "Acme"))
            .await
            .unwrap();
        repo.upsert(&MasterRecord::new(MasterDataKind::Consignee, "Acme"))
            .await
            .unwrap();

        let counts = repo.count_by_kind().await.unwrap();
        assert_eq!(counts.len(), 4);
        assert!(counts.contains(&(MasterDataKind::Shipper, 1)));
        assert!(counts.contains(&(MasterDataKind::Consignee, 1)));
        assert!(counts.contains(&(MasterDataKind::FlowerType, 0)));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = setup().await;
        let err = db
            .master_data()
            .upsert(&MasterRecord::new(MasterDataKind::ProductType, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup().await;
        let repo = db.master_data();
        repo.upsert(&MasterRecord::new(MasterDataKind::ProductType, "Roses"))
            .await
            .unwrap();

        let removed = repo.delete(MasterDataKind::ProductType, "ROSES").await.unwrap();
        assert_eq!(removed.name, "Roses");
        assert!(repo.name_keys(MasterDataKind::ProductType).await.unwrap().is_empty());
        assert!(repo.delete(MasterDataKind::ProductType, "Roses").await.is_err());
    }
}
