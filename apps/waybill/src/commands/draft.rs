//! # Draft Commands
//!
//! Draft persistence and the publish/discard transitions.
//!
//! ## Publish Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  publish(PublishRequest::Draft(id))      publish(PublishRequest::Form)  │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  EditSession::resume_draft(id)          EditSession::from_form(..)      │
//! │       └───────────────────┬────────────────────┘                        │
//! │                           ▼                                             │
//! │                 session.publish()                                       │
//! │                   1. prepare_publish (validate, normalize)              │
//! │                   2. one transaction: upsert shipment by invoice        │
//! │                      number, replace boxes, delete the draft            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use waybill_core::{Draft, DraftData, Shipment};

use crate::context::AppContext;
use crate::error::ApiResult;
use crate::state::EditSession;

/// What to publish.
#[derive(Debug, Clone)]
pub enum PublishRequest {
    /// A stored draft, as last saved.
    Draft(String),
    /// Current form content, optionally backed by a stored draft that is
    /// deleted on success.
    Form {
        draft_id: Option<String>,
        data: DraftData,
    },
}

/// One row of the draft list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: String,
    pub invoice_number: Option<String>,
    pub shipper: String,
    pub box_count: usize,
    pub current_step: u32,
    /// Set when the draft edits a published shipment.
    pub editing_existing: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Draft> for DraftSummary {
    fn from(d: Draft) -> Self {
        DraftSummary {
            invoice_number: d.label().map(str::to_string),
            shipper: d.data.header.shipper.clone(),
            box_count: d.data.boxes.len(),
            current_step: d.data.current_step,
            editing_existing: d.data.source_shipment_id.is_some(),
            id: d.id,
            updated_at: d.updated_at,
        }
    }
}

impl AppContext {
    // =========================================================================
    // Sessions
    // =========================================================================

    /// Opens an empty form.
    pub fn new_session(&self) -> EditSession {
        EditSession::new_shipment(self.db.clone(), &self.broadcaster)
    }

    pub async fn resume_session(&self, draft_id: &str) -> ApiResult<EditSession> {
        EditSession::resume_draft(self.db.clone(), &self.broadcaster, draft_id).await
    }

    /// Opens a published shipment for editing.
    pub async fn edit_shipment_session(&self, invoice_number: &str) -> ApiResult<EditSession> {
        EditSession::edit_shipment(self.db.clone(), &self.broadcaster, invoice_number).await
    }

    // =========================================================================
    // Drafts
    // =========================================================================

    /// Stores form content as a draft; returns its id.
    ///
    /// Passing the id from a previous save updates that draft.
    pub async fn save_draft(&self, draft_id: Option<&str>, form: &DraftData) -> ApiResult<String> {
        debug!(draft_id = ?draft_id, "save_draft command");
        let draft = self.db.drafts().save(draft_id, form).await?;
        Ok(draft.id)
    }

    /// Publishes a draft or form content and returns the shipment.
    pub async fn publish(&self, request: PublishRequest) -> ApiResult<Shipment> {
        let mut session = match request {
            PublishRequest::Draft(id) => {
                debug!(draft_id = %id, "publish command (stored draft)");
                self.resume_session(&id).await?
            }
            PublishRequest::Form { draft_id, data } => {
                debug!(draft_id = ?draft_id, "publish command (form)");
                EditSession::from_form(self.db.clone(), &self.broadcaster, draft_id, data)
            }
        };
        session.publish().await
    }

    /// Deletes a stored draft. Shipments are untouched.
    pub async fn discard_draft(&self, draft_id: &str) -> ApiResult<()> {
        debug!(draft_id = %draft_id, "discard_draft command");
        let mut session = self.resume_session(draft_id).await?;
        session.discard().await
    }

    /// Drafts, most recently updated first.
    pub async fn list_drafts(&self, limit: u32) -> ApiResult<Vec<DraftSummary>> {
        let drafts = self.db.drafts().list(limit).await?;
        Ok(drafts.into_iter().map(DraftSummary::from).collect())
    }

    pub async fn get_draft(&self, draft_id: &str) -> ApiResult<Draft> {
        self.db
            .drafts()
            .get(draft_id)
            .await?
            .ok_or_else(|| waybill_core::CoreError::DraftNotFound(draft_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::local_context;
    use crate::error::ErrorCode;
    use crate::PublishRequest;
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
        DraftData {
            header: ShipmentHeader::new(invoice, "Andes Flowers", "Miami Imports"),
            boxes: vec![shipment_box],
            ..DraftData::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_publish_stored_draft() {
        let ctx = local_context().await;
        let id = ctx.save_draft(None, &form("ks1001")).await.unwrap();
        let again = ctx.save_draft(Some(&id), &form("ks1001")).await.unwrap();
        assert_eq!(id, again);

        let shipment = ctx.publish(PublishRequest::Draft(id.clone())).await.unwrap();
        assert_eq!(shipment.invoice_number(), "KS1001");
        assert_eq!(shipment.boxes[0].box_number, 1);
        assert!(!shipment.boxes[0].id.is_empty());

        let err = ctx.get_draft(&id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_publishing_twice_leaves_one_shipment() {
        let ctx = local_context().await;
        let first = ctx
            .publish(PublishRequest::Form {
                draft_id: None,
                data: form("ks1001"),
            })
            .await
            .unwrap();

        let draft_id = ctx.save_draft(None, &form("KS1001")).await.unwrap();
        let second = ctx.publish(PublishRequest::Draft(draft_id)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ctx.db().shipments().count().await.unwrap(), 1);
        assert!(ctx.list_drafts(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copied_form_publishes_under_new_invoice() {
        let ctx = local_context().await;
        let mut data = form("KS1001");
        let copy = data.boxes[0].clone();
        data.boxes.push(copy);

        let first = ctx
            .publish(PublishRequest::Form { draft_id: None, data: data.clone() })
            .await
            .unwrap();
        assert_eq!(first.boxes.len(), 2);

        data.header.invoice_number = "KS2002".into();
        let second = ctx
            .publish(PublishRequest::Form { draft_id: None, data })
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.boxes.len(), 2);
        assert_eq!(ctx.db().shipments().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_publish_form_with_missing_consignee() {
        let ctx = local_context().await;
        let mut data = form("KS1001");
        data.header.consignee = "  ".into();

        let err = ctx
            .publish(PublishRequest::Form { draft_id: None, data })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(ctx.db().shipments().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_discard_draft() {
        let ctx = local_context().await;
        let id = ctx.save_draft(None, &form("KS1001")).await.unwrap();

        ctx.discard_draft(&id).await.unwrap();
        assert!(ctx.list_drafts(10).await.unwrap().is_empty());
        assert_eq!(ctx.db().shipments().count().await.unwrap(), 0);

        let err = ctx.discard_draft(&id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_draft_summaries() {
        let ctx = local_context().await;
        ctx.save_draft(None, &DraftData::default()).await.unwrap();
        ctx.save_draft(None, &form(" ks2002 ")).await.unwrap();

        let drafts = ctx.list_drafts(10).await.unwrap();
        assert_eq!(drafts.len(), 2);
        let labelled: Vec<_> = drafts.iter().filter_map(|d| d.invoice_number.clone()).collect();
        assert_eq!(labelled, vec!["ks2002".to_string()]);

        let json = serde_json::to_value(&drafts[0]).unwrap();
        assert!(json.get("boxCount").is_some());
    }
}
