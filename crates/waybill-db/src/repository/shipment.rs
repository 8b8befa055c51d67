//! # Shipment Repository
//!
//! Shipments with their boxes and products, and the publish transaction
//! that turns a draft into a shipment.
//!
//! ## Publish Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. look up invoice_number (normalized)                              │
//! │         ├── owned by another shipment than the one being edited        │
//! │         │     → ROLLBACK, Conflict                                     │
//! │         ├── exists  → UPDATE header                                    │
//! │         └── missing → INSERT header                                    │
//! │    2. DELETE boxes of the shipment (products cascade)                  │
//! │    3. INSERT boxes + products in list order                            │
//! │    4. DELETE source draft                                              │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure rolls back all four steps: the draft survives and the
//! previous shipment content is untouched.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use waybill_core::validation::normalize_invoice_number;
use waybill_core::{
    CoreError, Money, PublishPlan, Shipment, ShipmentBox, ShipmentHeader, ShipmentProduct,
    ShipmentStatus, Weight,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: String,
    invoice_number: String,
    shipper: String,
    consignee: String,
    invoice_title: Option<String>,
    awb: Option<String>,
    master_awb: Option<String>,
    house_awb: Option<String>,
    flight_no: Option<String>,
    flight_date: Option<NaiveDate>,
    discharge_airport: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    eta: Option<NaiveDate>,
    invoice_date: Option<NaiveDate>,
    date_of_issue: Option<NaiveDate>,
    place_of_receipt: Option<String>,
    client_ref: Option<String>,
    freight_terms: Option<String>,
    gross_weight_grams: Option<i64>,
    status: ShipmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShipmentRow {
    fn into_shipment(self, boxes: Vec<ShipmentBox>) -> Shipment {
        Shipment {
            id: self.id,
            header: ShipmentHeader {
                invoice_number: self.invoice_number,
                shipper: self.shipper,
                consignee: self.consignee,
                invoice_title: self.invoice_title,
                awb: self.awb,
                master_awb: self.master_awb,
                house_awb: self.house_awb,
                flight_no: self.flight_no,
                flight_date: self.flight_date,
                discharge_airport: self.discharge_airport,
                origin: self.origin,
                destination: self.destination,
                eta: self.eta,
                invoice_date: self.invoice_date,
                date_of_issue: self.date_of_issue,
                place_of_receipt: self.place_of_receipt,
                client_ref: self.client_ref,
                freight_terms: self.freight_terms,
                gross_weight: self.gross_weight_grams.map(Weight::from_grams),
                status: self.status,
            },
            boxes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BoxRow {
    id: String,
    box_number: i64,
    length: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    box_id: String,
    product_type: String,
    flower_type: Option<String>,
    has_stems: bool,
    weight_grams: i64,
    rate_cents: i64,
    approx_quantity: i64,
}

impl From<ProductRow> for ShipmentProduct {
    fn from(row: ProductRow) -> Self {
        ShipmentProduct {
            id: row.id,
            product_type: row.product_type,
            flower_type: row.flower_type,
            has_stems: row.has_stems,
            weight: Weight::from_grams(row.weight_grams),
            rate: Money::from_cents(row.rate_cents),
            approx_quantity: row.approx_quantity,
        }
    }
}

const SHIPMENT_COLUMNS: &str = r#"
    id, invoice_number, shipper, consignee, invoice_title,
    awb, master_awb, house_awb, flight_no, flight_date,
    discharge_airport, origin, destination, eta, invoice_date,
    date_of_issue, place_of_receipt, client_ref, freight_terms,
    gross_weight_grams, status, created_at, updated_at
"#;

// =============================================================================
// Publish Types
// =============================================================================

/// Where a publish comes from.
#[derive(Debug, Clone, Default)]
pub struct PublishSource {
    /// Draft row to delete in the same transaction.
    pub draft_id: Option<String>,
    /// Shipment the form was loaded from, when editing an existing one.
    pub shipment_id: Option<String>,
}

/// Result of a publish.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub shipment: Shipment,
    /// `true` when a new shipment row was inserted.
    pub created: bool,
    /// `true` when the source draft row existed and was deleted.
    pub draft_deleted: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for shipment database operations.
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    /// Gets a shipment by invoice number (case-insensitive).
    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<Shipment>> {
        let key = normalize_invoice_number(invoice_number);
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM shipments WHERE invoice_number = ?1")
                .bind(&key)
                .fetch_optional(&mut *conn)
                .await?;
        match id {
            Some(id) => fetch_shipment(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_shipment(&mut conn, id).await
    }

    /// Lists shipments, most recently updated first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM shipments ORDER BY updated_at DESC, invoice_number LIMIT ?1 OFFSET ?2",
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&mut *conn)
        .await?;

        let mut shipments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(shipment) = fetch_shipment(&mut conn, &id).await? {
                shipments.push(shipment);
            }
        }
        Ok(shipments)
    }

    /// Every shipment whose invoice number is in `invoice_numbers`.
    pub async fn list_by_invoices(&self, invoice_numbers: &[String]) -> DbResult<Vec<Shipment>> {
        let mut conn = self.pool.acquire().await?;
        let mut shipments = Vec::with_capacity(invoice_numbers.len());
        for invoice in invoice_numbers {
            let id: Option<String> =
                sqlx::query_scalar("SELECT id FROM shipments WHERE invoice_number = ?1")
                    .bind(invoice)
                    .fetch_optional(&mut *conn)
                    .await?;
            if let Some(id) = id {
                if let Some(shipment) = fetch_shipment(&mut conn, &id).await? {
                    shipments.push(shipment);
                }
            }
        }
        Ok(shipments)
    }

    /// All natural keys, sorted.
    pub async fn invoice_numbers(&self) -> DbResult<Vec<String>> {
        let keys = sqlx::query_scalar("SELECT invoice_number FROM shipments ORDER BY invoice_number")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    pub async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Inserts a new shipment; an existing invoice number is a conflict.
    pub async fn create(&self, plan: &PublishPlan) -> DbResult<Shipment> {
        let key = normalize_invoice_number(plan.invoice_number());
        debug!(invoice_number = %key, "Creating shipment");

        let mut tx = self.pool.begin().await?;
        if find_id(&mut tx, &key).await?.is_some() {
            return Err(CoreError::Conflict { invoice_number: key }.into());
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        insert_header(&mut tx, &id, &key, &plan.header, now).await?;
        replace_boxes(&mut tx, &id, &plan.boxes).await?;
        let shipment = fetch_shipment(&mut tx, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment", &key))?;
        tx.commit().await?;

        info!(invoice_number = %key, boxes = plan.boxes.len(), "Shipment created");
        Ok(shipment)
    }

    /// Publishes validated form content atomically.
    ///
    /// ## Create vs Update
    /// Decided by looking up the normalized invoice number, never by a
    /// caller-supplied mode:
    /// - no shipment owns the number → insert (reusing `source.shipment_id`
    ///   when editing, so a rename keeps the shipment's identity)
    /// - the number belongs to `source.shipment_id`, or no origin was
    ///   given → update in place
    /// - the number belongs to a different shipment than the one being
    ///   edited → `Conflict`
    pub async fn publish(&self, plan: &PublishPlan, source: &PublishSource) -> DbResult<PublishOutcome> {
        let key = normalize_invoice_number(plan.invoice_number());
        debug!(
            invoice_number = %key,
            draft_id = ?source.draft_id,
            origin = ?source.shipment_id,
            "Publishing shipment"
        );

        let mut tx = self.pool.begin().await?;
        let owner = find_id(&mut tx, &key).await?;
        let now = Utc::now();

        let origin_exists = match (&owner, source.shipment_id.as_deref()) {
            (None, Some(origin)) => exists(&mut tx, origin).await?,
            _ => false,
        };

        let (target_id, created) = match (owner, source.shipment_id.as_deref()) {
            (Some(owner), Some(origin)) if owner != origin => {
                return Err(CoreError::Conflict { invoice_number: key }.into());
            }
            (Some(owner), _) => {
                update_header(&mut tx, &owner, &key, &plan.header, now).await?;
                (owner, false)
            }
            (None, Some(origin)) if origin_exists => {
                update_header(&mut tx, origin, &key, &plan.header, now).await?;
                (origin.to_string(), false)
            }
            (None, origin) => {
                let id = origin
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                insert_header(&mut tx, &id, &key, &plan.header, now).await?;
                (id, true)
            }
        };

        replace_boxes(&mut tx, &target_id, &plan.boxes).await?;

        let draft_deleted = match &source.draft_id {
            Some(draft_id) => {
                sqlx::query("DELETE FROM drafts WHERE id = ?1")
                    .bind(draft_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected()
                    > 0
            }
            None => false,
        };

        let shipment = fetch_shipment(&mut tx, &target_id)
            .await?
            .ok_or_else(|| DbError::not_found("Shipment", &key))?;
        tx.commit().await?;

        info!(
            invoice_number = %key,
            created,
            draft_deleted,
            boxes = plan.boxes.len(),
            "Shipment published"
        );

        Ok(PublishOutcome {
            shipment,
            created,
            draft_deleted,
        })
    }

    /// Deletes a shipment and, by cascade, its boxes and products.
    pub async fn delete(&self, invoice_number: &str) -> DbResult<()> {
        let key = normalize_invoice_number(invoice_number);
        debug!(invoice_number = %key, "Deleting shipment");

        let result = sqlx::query("DELETE FROM shipments WHERE invoice_number = ?1")
            .bind(&key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shipment", key));
        }
        Ok(())
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================
// Shared by pool reads and the publish transaction.

async fn find_id(conn: &mut SqliteConnection, invoice_key: &str) -> DbResult<Option<String>> {
    let id = sqlx::query_scalar("SELECT id FROM shipments WHERE invoice_number = ?1")
        .bind(invoice_key)
        .fetch_optional(conn)
        .await?;
    Ok(id)
}

async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM shipments WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

async fn insert_header(
    conn: &mut SqliteConnection,
    id: &str,
    invoice_key: &str,
    header: &ShipmentHeader,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shipments (
            id, invoice_number, shipper, consignee, invoice_title,
            awb, master_awb, house_awb, flight_no, flight_date,
            discharge_airport, origin, destination, eta, invoice_date,
            date_of_issue, place_of_receipt, client_ref, freight_terms,
            gross_weight_grams, status, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23
        )
        "#,
    )
    .bind(id)
    .bind(invoice_key)
    .bind(&header.shipper)
    .bind(&header.consignee)
    .bind(&header.invoice_title)
    .bind(&header.awb)
    .bind(&header.master_awb)
    .bind(&header.house_awb)
    .bind(&header.flight_no)
    .bind(header.flight_date)
    .bind(&header.discharge_airport)
    .bind(&header.origin)
    .bind(&header.destination)
    .bind(header.eta)
    .bind(header.invoice_date)
    .bind(header.date_of_issue)
    .bind(&header.place_of_receipt)
    .bind(&header.client_ref)
    .bind(&header.freight_terms)
    .bind(header.gross_weight.map(|w| w.grams()))
    .bind(header.status)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_header(
    conn: &mut SqliteConnection,
    id: &str,
    invoice_key: &str,
    header: &ShipmentHeader,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE shipments SET
            invoice_number = ?2, shipper = ?3, consignee = ?4, invoice_title = ?5,
            awb = ?6, master_awb = ?7, house_awb = ?8, flight_no = ?9, flight_date = ?10,
            discharge_airport = ?11, origin = ?12, destination = ?13, eta = ?14,
            invoice_date = ?15, date_of_issue = ?16, place_of_receipt = ?17,
            client_ref = ?18, freight_terms = ?19, gross_weight_grams = ?20,
            status = ?21, updated_at = ?22
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(invoice_key)
    .bind(&header.shipper)
    .bind(&header.consignee)
    .bind(&header.invoice_title)
    .bind(&header.awb)
    .bind(&header.master_awb)
    .bind(&header.house_awb)
    .bind(&header.flight_no)
    .bind(header.flight_date)
    .bind(&header.discharge_airport)
    .bind(&header.origin)
    .bind(&header.destination)
    .bind(header.eta)
    .bind(header.invoice_date)
    .bind(header.date_of_issue)
    .bind(&header.place_of_receipt)
    .bind(&header.client_ref)
    .bind(&header.freight_terms)
    .bind(header.gross_weight.map(|w| w.grams()))
    .bind(header.status)
    .bind(now)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Shipment", id));
    }
    Ok(())
}

/// Wholesale replacement: old boxes go (products cascade), new ones are
/// written in list order with their position as box number.
///
/// Box and product ids are table-wide keys. An id still present after the
/// delete belongs to another shipment (the form was copied from it) and is
/// replaced with a fresh one.
async fn replace_boxes(conn: &mut SqliteConnection, shipment_id: &str, boxes: &[ShipmentBox]) -> DbResult<()> {
    sqlx::query("DELETE FROM shipment_boxes WHERE shipment_id = ?1")
        .bind(shipment_id)
        .execute(&mut *conn)
        .await?;

    for (idx, shipment_box) in boxes.iter().enumerate() {
        let box_id = free_id(conn, RowTable::Boxes, &shipment_box.id).await?;
        sqlx::query(
            r#"
            INSERT INTO shipment_boxes (id, shipment_id, box_number, length, width, height)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&box_id)
        .bind(shipment_id)
        .bind(idx as i64 + 1)
        .bind(shipment_box.length)
        .bind(shipment_box.width)
        .bind(shipment_box.height)
        .execute(&mut *conn)
        .await?;

        for (position, product) in shipment_box.products.iter().enumerate() {
            let product_id = free_id(conn, RowTable::Products, &product.id).await?;
            sqlx::query(
                r#"
                INSERT INTO shipment_products (
                    id, box_id, position, product_type, flower_type,
                    has_stems, weight_grams, rate_cents, approx_quantity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&product_id)
            .bind(&box_id)
            .bind(position as i64)
            .bind(&product.product_type)
            .bind(&product.flower_type)
            .bind(product.has_stems)
            .bind(product.weight.grams())
            .bind(product.rate.cents())
            .bind(product.approx_quantity)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum RowTable {
    Boxes,
    Products,
}

impl RowTable {
    fn exists_query(self) -> &'static str {
        match self {
            RowTable::Boxes => "SELECT 1 FROM shipment_boxes WHERE id = ?1",
            RowTable::Products => "SELECT 1 FROM shipment_products WHERE id = ?1",
        }
    }
}

/// `id` if no row of `table` uses it yet (and it is not blank), else a new UUID.
async fn free_id(conn: &mut SqliteConnection, table: RowTable, id: &str) -> DbResult<String> {
    if id.trim().is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }
    let taken: Option<i64> = sqlx::query_scalar(table.exists_query())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    if taken.is_none() {
        return Ok(id.to_string());
    }
    let fresh = Uuid::new_v4().to_string();
    debug!(?table, old_id = %id, new_id = %fresh, "Row id owned by another shipment, reassigned");
    Ok(fresh)
}

async fn fetch_shipment(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shipment>> {
    let row: Option<ShipmentRow> =
        sqlx::query_as(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let box_rows: Vec<BoxRow> = sqlx::query_as(
        r#"
        SELECT id, box_number, length, width, height
        FROM shipment_boxes
        WHERE shipment_id = ?1
        ORDER BY box_number
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let product_rows: Vec<ProductRow> = sqlx::query_as(
        r#"
        SELECT p.id, p.box_id, p.product_type, p.flower_type, p.has_stems,
               p.weight_grams, p.rate_cents, p.approx_quantity
        FROM shipment_products p
        JOIN shipment_boxes b ON b.id = p.box_id
        WHERE b.shipment_id = ?1
        ORDER BY b.box_number, p.position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut products_by_box: HashMap<String, Vec<ShipmentProduct>> = HashMap::new();
    for product in product_rows {
        products_by_box
            .entry(product.box_id.clone())
            .or_default()
            .push(product.into());
    }

    let boxes = box_rows
        .into_iter()
        .map(|b| ShipmentBox {
            products: products_by_box.remove(&b.id).unwrap_or_default(),
            id: b.id,
            box_number: u32::try_from(b.box_number).unwrap_or(0),
            length: b.length,
            width: b.width,
            height: b.height,
        })
        .collect();

    Ok(Some(row.into_shipment(boxes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use waybill_core::{prepare_publish, DraftData};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn plan(invoice: &str) -> PublishPlan {
        let mut data = DraftData::default();
        data.header = ShipmentHeader::new(invoice, "Andes Flowers", "Dutch Auction BV");
        let mut shipment_box = ShipmentBox::new();
        shipment_box.products.push(ShipmentProduct::new(
            "Roses",
            Weight::from_grams(25_500),
            Money::from_cents(1500),
        ));
        shipment_box.products.push(ShipmentProduct::new(
            "Carnations",
            Weight::from_grams(20_000),
            Money::from_cents(1250),
        ));
        data.boxes = vec![shipment_box, ShipmentBox::new()];
        prepare_publish(&data).unwrap()
    }

    #[tokio::test]
    async fn test_publish_creates_then_updates() {
        let db = setup().await;
        let repo = db.shipments();

        let first = repo.publish(&plan("ks1001"), &PublishSource::default()).await.unwrap();
        assert!(first.created);
        assert_eq!(first.shipment.invoice_number(), "KS1001");
        assert_eq!(first.shipment.boxes.len(), 2);
        assert_eq!(first.shipment.boxes[0].products.len(), 2);
        assert_eq!(first.shipment.boxes[0].products[1].product_type, "Carnations");

        let mut second_plan = plan("KS1001");
        second_plan.boxes.truncate(1);
        let second = repo.publish(&second_plan, &PublishSource::default()).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.shipment.id, first.shipment.id);
        assert_eq!(second.shipment.boxes.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_content() {
        let db = setup().await;
        let mut p = plan("KS2000");
        p.header.flight_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        p.header.gross_weight = Some(Weight::from_grams(48_000));
        p.header.status = ShipmentStatus::InTransit;
        p.boxes[0].length = 100.0;

        let published = db.shipments().publish(&p, &PublishSource::default()).await.unwrap();
        let loaded = db.shipments().get_by_invoice("ks2000").await.unwrap().unwrap();

        assert_eq!(loaded, published.shipment);
        assert_eq!(loaded.header.flight_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(loaded.header.gross_weight, Some(Weight::from_grams(48_000)));
        assert_eq!(loaded.header.status, ShipmentStatus::InTransit);
        assert_eq!(loaded.boxes[0].length, 100.0);
        assert_eq!(loaded.boxes[0].products[0].weight.grams(), 25_500);
        assert_eq!(loaded.boxes[0].products[0].rate.cents(), 1500);
        assert_eq!(
            loaded.boxes.iter().map(|b| b.box_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_create_conflicts_on_existing_invoice() {
        let db = setup().await;
        let repo = db.shipments();
        repo.create(&plan("KS1001")).await.unwrap();

        let err = repo.create(&plan("ks1001")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rename_onto_other_shipment_conflicts() {
        let db = setup().await;
        let repo = db.shipments();
        let a = repo.create(&plan("KS1001")).await.unwrap();
        repo.create(&plan("KS1002")).await.unwrap();

        let source = PublishSource {
            draft_id: None,
            shipment_id: Some(a.id.clone()),
        };
        let err = repo.publish(&plan("KS1002"), &source).await.unwrap_err();
        assert!(err.is_conflict());

        // Renaming onto a free number keeps identity.
        let renamed = repo.publish(&plan("KS1003"), &source).await.unwrap();
        assert!(!renamed.created);
        assert_eq!(renamed.shipment.id, a.id);
        assert!(repo.get_by_invoice("KS1001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_deletes_draft_atomically() {
        let db = setup().await;
        let mut data = DraftData::default();
        data.header = ShipmentHeader::new("KS1001", "Andes Flowers", "Dutch Auction BV");
        let draft = db.drafts().save(None, &data).await.unwrap();

        let source = PublishSource {
            draft_id: Some(draft.id.clone()),
            shipment_id: None,
        };
        let outcome = db
            .shipments()
            .publish(&prepare_publish(&data).unwrap(), &source)
            .await
            .unwrap();
        assert!(outcome.draft_deleted);
        assert!(db.drafts().get(&draft.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_publish_keeps_draft() {
        let db = setup().await;
        let repo = db.shipments();
        let a = repo.create(&plan("KS1001")).await.unwrap();
        repo.create(&plan("KS1002")).await.unwrap();

        let mut data = DraftData::default();
        data.header = ShipmentHeader::new("KS1002", "Andes Flowers", "Dutch Auction BV");
        let draft = db.drafts().save(None, &data).await.unwrap();

        let source = PublishSource {
            draft_id: Some(draft.id.clone()),
            shipment_id: Some(a.id),
        };
        assert!(repo.publish(&prepare_publish(&data).unwrap(), &source).await.is_err());
        assert!(db.drafts().get(&draft.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_same_form_under_two_invoice_numbers() {
        let db = setup().await;
        let repo = db.shipments();

        let mut data = DraftData::default();
        data.header = ShipmentHeader::new("KS1001", "Andes Flowers", "Dutch Auction BV");
        data.boxes = plan("KS1001").boxes;
        let first = repo
            .publish(&prepare_publish(&data).unwrap(), &PublishSource::default())
            .await
            .unwrap();

        data.header.invoice_number = "KS2002".into();
        let second = repo
            .publish(&prepare_publish(&data).unwrap(), &PublishSource::default())
            .await
            .unwrap();

        assert!(second.created);
        assert_ne!(second.shipment.id, first.shipment.id);
        assert_ne!(second.shipment.boxes[0].id, first.shipment.boxes[0].id);
        assert_ne!(
            second.shipment.boxes[0].products[0].id,
            first.shipment.boxes[0].products[0].id
        );
        assert_eq!(second.shipment.boxes[0].products.len(), 2);

        // The first shipment keeps its own rows.
        let reloaded = repo.get_by_invoice("KS1001").await.unwrap().unwrap();
        assert_eq!(reloaded, first.shipment);

        // Republishing in place keeps ids that the shipment already owns.
        data.header.invoice_number = "KS1001".into();
        let again = repo
            .publish(&prepare_publish(&data).unwrap(), &PublishSource::default())
            .await
            .unwrap();
        assert!(!again.created);
        assert_eq!(again.shipment.id, first.shipment.id);
        assert_eq!(again.shipment.boxes[0].id, data.boxes[0].id);
    }

    #[tokio::test]
    async fn test_form_with_duplicated_box_publishes() {
        let db = setup().await;
        let mut data = DraftData::default();
        data.header = ShipmentHeader::new("KS1001", "Andes Flowers", "Dutch Auction BV");
        data.boxes = plan("KS1001").boxes;
        let copy = data.boxes[0].clone();
        data.boxes.push(copy);

        let outcome = db
            .shipments()
            .publish(&prepare_publish(&data).unwrap(), &PublishSource::default())
            .await
            .unwrap();
        assert_eq!(outcome.shipment.boxes.len(), 3);
        assert_eq!(outcome.shipment.boxes[2].products.len(), 2);
        assert_ne!(outcome.shipment.boxes[2].id, outcome.shipment.boxes[0].id);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let db = setup().await;
        let repo = db.shipments();
        repo.create(&plan("KS1001")).await.unwrap();
        repo.create(&plan("KS1002")).await.unwrap();

        assert_eq!(repo.list(10, 0).await.unwrap().len(), 2);
        assert_eq!(repo.invoice_numbers().await.unwrap(), vec!["KS1001", "KS1002"]);

        repo.delete("ks1001").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(matches!(
            repo.delete("KS1001").await,
            Err(DbError::NotFound { .. })
        ));

        // Cascade removed boxes and products of the deleted shipment.
        let boxes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipment_boxes")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(boxes, 2);
    }
}
