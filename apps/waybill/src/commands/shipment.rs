//! # Shipment Commands
//!
//! Direct shipment access and the Totals Calculator.
//!
//! `create_shipment` is the strict path: any invoice-number collision is a
//! `CONFLICT`, unlike `publish`, which updates the existing shipment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use waybill_core::{
    compute_totals_with, prepare_publish, CoreError, DraftData, Shipment, ShipmentBox,
    ShipmentStatus, Totals,
};

use crate::context::AppContext;
use crate::error::ApiResult;

/// One row of the shipment list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSummary {
    pub id: String,
    pub invoice_number: String,
    pub shipper: String,
    pub consignee: String,
    pub status: ShipmentStatus,
    pub box_count: usize,
    pub product_count: usize,
    pub total_cents: i64,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentSummary {
    fn from_shipment(s: Shipment, totals: &Totals) -> Self {
        ShipmentSummary {
            box_count: s.boxes.len(),
            product_count: s.product_count(),
            total_cents: totals.total.cents(),
            id: s.id,
            invoice_number: s.header.invoice_number,
            shipper: s.header.shipper,
            consignee: s.header.consignee,
            status: s.header.status,
            updated_at: s.updated_at,
        }
    }
}

impl AppContext {
    /// Inserts a shipment, failing with `CONFLICT` if the invoice number
    /// is taken.
    pub async fn create_shipment(&self, form: &DraftData) -> ApiResult<Shipment> {
        let plan = prepare_publish(form)?;
        debug!(invoice_number = %plan.invoice_number(), "create_shipment command");
        Ok(self.db.shipments().create(&plan).await?)
    }

    /// Shipments, most recently updated first.
    pub async fn list_shipments(&self, limit: u32, offset: u32) -> ApiResult<Vec<ShipmentSummary>> {
        let policy = self.totals_policy();
        let shipments = self.db.shipments().list(limit, offset).await?;
        Ok(shipments
            .into_iter()
            .map(|s| {
                let totals = compute_totals_with(&s.boxes, &policy);
                ShipmentSummary::from_shipment(s, &totals)
            })
            .collect())
    }

    /// Looks a shipment up by invoice number (case-insensitive).
    pub async fn get_shipment(&self, invoice_number: &str) -> ApiResult<Shipment> {
        self.db
            .shipments()
            .get_by_invoice(invoice_number)
            .await?
            .ok_or_else(|| CoreError::ShipmentNotFound(invoice_number.to_string()).into())
    }

    pub async fn delete_shipment(&self, invoice_number: &str) -> ApiResult<()> {
        debug!(invoice_number = %invoice_number, "delete_shipment command");
        Ok(self.db.shipments().delete(invoice_number).await?)
    }

    /// Totals for the given boxes under the configured tax and discount.
    pub fn compute_totals(&self, boxes: &[ShipmentBox]) -> Totals {
        compute_totals_with(boxes, &self.totals_policy())
    }

    pub async fn shipment_totals(&self, invoice_number: &str) -> ApiResult<Totals> {
        let shipment = self.get_shipment(invoice_number).await?;
        Ok(self.compute_totals(&shipment.boxes))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::local_context;
    use crate::error::ErrorCode;
    use waybill_core::{
        DraftData, Money, ShipmentBox, ShipmentHeader, ShipmentProduct, Weight,
    };

    fn form(invoice: &str) -> DraftData {
        let mut shipment_box = ShipmentBox::new();
        shipment_box.products.push(ShipmentProduct::new(
            "Roses",
            Weight::from_kg(25.5),
            Money::from_cents(1500),
        ));
        shipment_box.products.push(ShipmentProduct::new(
            "Carnations",
            Weight::from_kg(20.0),
            Money::from_cents(1250),
        ));
        DraftData {
            header: ShipmentHeader::new(invoice, "Andes Flowers", "Miami Imports"),
            boxes: vec![shipment_box],
            ..DraftData::default()
        }
    }

    #[tokio::test]
    async fn test_compute_totals_example_invoice() {
        let ctx = local_context().await;
        let totals = ctx.compute_totals(&form("KS1001").boxes);

        assert_eq!(totals.subtotal, Money::from_cents(63250));
        assert_eq!(totals.tax, Money::from_cents(6325));
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.total, Money::from_cents(69575));
        assert_eq!(totals.total, totals.subtotal + totals.tax - totals.discount);
        assert_eq!(totals.total_items, 2);
    }

    #[tokio::test]
    async fn test_create_shipment_conflicts_on_any_collision() {
        let ctx = local_context().await;
        ctx.create_shipment(&form("ks1001")).await.unwrap();

        let err = ctx.create_shipment(&form("KS1001")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(ctx.db().shipments().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_get_delete() {
        let ctx = local_context().await;
        ctx.create_shipment(&form("KS1001")).await.unwrap();
        ctx.create_shipment(&form("KS1002")).await.unwrap();

        let list = ctx.list_shipments(10, 0).await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|s| s.total_cents == 69575 && s.product_count == 2));

        let shipment = ctx.get_shipment("ks1002").await.unwrap();
        assert_eq!(shipment.invoice_number(), "KS1002");
        let totals = ctx.shipment_totals("KS1002").await.unwrap();
        assert_eq!(totals.subtotal, Money::from_cents(63250));

        ctx.delete_shipment("KS1002").await.unwrap();
        assert_eq!(
            ctx.get_shipment("KS1002").await.unwrap_err().code,
            ErrorCode::NotFound
        );
        assert_eq!(
            ctx.delete_shipment("KS1002").await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }
}
