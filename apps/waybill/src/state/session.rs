//! # Edit Session
//!
//! One open invoice form and its draft/publish lifecycle.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   new_shipment() ──┐        edit ops                                   │
//! │   edit_shipment() ─┤      ┌─────────┐                                  │
//! │                    ▼      ▼         │                                  │
//! │               ┌──────────────┐      │                                  │
//! │               │   Editing    │──────┘                                  │
//! │               └──────┬───────┘                                         │
//! │          save()  │   ▲ edit ops       publish()                        │
//! │                  ▼   │             ┌──────────────────┐                │
//! │   resume_draft() ──► ┌──────────────┐ ──────────────►│   Published    │ │
//! │                      │    Saved     │                └──────────────────┘ │
//! │                      └──────┬───────┘  (Editing may publish too)       │
//! │                             │ discard()                                │
//! │                             ▼                                          │
//! │                      ┌──────────────┐                                  │
//! │                      │  Discarded   │                                  │
//! │                      └──────────────┘                                  │
//! │                                                                         │
//! │  Published and Discarded are terminal: every operation fails with      │
//! │  INVALID_STATE.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Publish
//! Validation and normalization happen in `prepare_publish` before anything
//! is written. The write itself (shipment upsert by invoice number, box
//! replacement, draft deletion) is one transaction in `waybill-db`. A failed
//! publish leaves the session where it was.
//!
//! While open, a session listens for master-data changes; the listener is
//! removed when the session ends or is dropped.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use waybill_core::{
    boxes, compute_totals_with, prepare_publish, CoreError, DraftData, DraftState,
    MasterDataChange, Shipment, ShipmentBox, ShipmentHeader, ShipmentProduct, Totals, TotalsPolicy,
};
use waybill_db::{Database, DbError, PublishSource};

use super::broadcaster::{MasterDataBroadcaster, Subscription};
use crate::error::ApiResult;

/// An open invoice form.
#[derive(Debug)]
pub struct EditSession {
    db: Database,
    state: DraftState,
    draft_id: Option<String>,
    data: DraftData,
    master_changes: Arc<Mutex<Vec<MasterDataChange>>>,
    subscription: Option<Subscription>,
}

impl EditSession {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Empty form for a new invoice.
    pub fn new_shipment(db: Database, broadcaster: &MasterDataBroadcaster) -> Self {
        Self::open(db, broadcaster, DraftState::Editing, None, DraftData::default())
    }

    /// Reopens a stored draft.
    pub async fn resume_draft(
        db: Database,
        broadcaster: &MasterDataBroadcaster,
        draft_id: &str,
    ) -> ApiResult<Self> {
        let draft = db
            .drafts()
            .get(draft_id)
            .await?
            .ok_or_else(|| CoreError::DraftNotFound(draft_id.to_string()))?;
        Ok(Self::open(
            db,
            broadcaster,
            DraftState::Saved,
            Some(draft.id),
            draft.data,
        ))
    }

    /// Loads a published shipment into the form.
    pub async fn edit_shipment(
        db: Database,
        broadcaster: &MasterDataBroadcaster,
        invoice_number: &str,
    ) -> ApiResult<Self> {
        let shipment = db
            .shipments()
            .get_by_invoice(invoice_number)
            .await?
            .ok_or_else(|| CoreError::ShipmentNotFound(invoice_number.to_string()))?;
        let data = DraftData::from_shipment(&shipment);
        Ok(Self::open(db, broadcaster, DraftState::Editing, None, data))
    }

    /// Wraps form content handed over by the presentation layer.
    ///
    /// With a `draft_id` the session behaves like a resumed draft.
    pub fn from_form(
        db: Database,
        broadcaster: &MasterDataBroadcaster,
        draft_id: Option<String>,
        data: DraftData,
    ) -> Self {
        let state = if draft_id.is_some() {
            DraftState::Saved
        } else {
            DraftState::Editing
        };
        Self::open(db, broadcaster, state, draft_id, data)
    }

    fn open(
        db: Database,
        broadcaster: &MasterDataBroadcaster,
        state: DraftState,
        draft_id: Option<String>,
        data: DraftData,
    ) -> Self {
        let master_changes = Arc::new(Mutex::new(Vec::new()));
        let subscription = {
            let sink = master_changes.clone();
            broadcaster.subscribe(move |change: &MasterDataChange| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(change.clone());
            })
        };
        debug!(state = %state, draft_id = ?draft_id, "Edit session opened");

        EditSession {
            db,
            state,
            draft_id,
            data,
            master_changes,
            subscription: Some(subscription),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn draft_id(&self) -> Option<&str> {
        self.draft_id.as_deref()
    }

    pub fn data(&self) -> &DraftData {
        &self.data
    }

    /// True when the form was loaded from a published shipment.
    pub fn is_editing_existing(&self) -> bool {
        self.data.source_shipment_id.is_some()
    }

    pub fn totals(&self, policy: &TotalsPolicy) -> Totals {
        compute_totals_with(&self.data.boxes, policy)
    }

    /// Master-data changes seen since the last call.
    pub fn take_master_changes(&self) -> Vec<MasterDataChange> {
        std::mem::take(&mut *self.master_changes.lock().unwrap_or_else(PoisonError::into_inner))
    }

    // =========================================================================
    // Form Editing
    // =========================================================================

    pub fn set_header(&mut self, header: ShipmentHeader) -> ApiResult<()> {
        self.begin_edit("edit")?;
        self.data.header = header;
        Ok(())
    }

    pub fn add_box(&mut self, shipment_box: ShipmentBox) -> ApiResult<usize> {
        self.begin_edit("add a box")?;
        Ok(boxes::add_box(&mut self.data.boxes, shipment_box))
    }

    pub fn remove_box(&mut self, index: usize) -> ApiResult<ShipmentBox> {
        self.begin_edit("remove a box")?;
        Ok(boxes::remove_box(&mut self.data.boxes, index)?)
    }

    pub fn add_product(&mut self, box_index: usize, product: ShipmentProduct) -> ApiResult<usize> {
        self.begin_edit("add a product")?;
        Ok(boxes::add_product(&mut self.data.boxes, box_index, product)?)
    }

    pub fn remove_product(
        &mut self,
        box_index: usize,
        product_index: usize,
    ) -> ApiResult<ShipmentProduct> {
        self.begin_edit("remove a product")?;
        Ok(boxes::remove_product(&mut self.data.boxes, box_index, product_index)?)
    }

    pub fn update_product(
        &mut self,
        box_index: usize,
        product_index: usize,
        product: ShipmentProduct,
    ) -> ApiResult<()> {
        self.begin_edit("update a product")?;
        Ok(boxes::replace_product(
            &mut self.data.boxes,
            box_index,
            product_index,
            product,
        )?)
    }

    /// Records which wizard step the form is on.
    pub fn set_step(&mut self, step: u32) -> ApiResult<()> {
        self.begin_edit("change step")?;
        self.data.current_step = step;
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Upserts the draft; the first save assigns its id.
    pub async fn save(&mut self) -> ApiResult<String> {
        self.ensure_open("save")?;
        let draft = self
            .db
            .drafts()
            .save(self.draft_id.as_deref(), &self.data)
            .await?;

        info!(draft_id = %draft.id, invoice_number = ?draft.label(), "Draft saved");
        self.draft_id = Some(draft.id.clone());
        self.state = DraftState::Saved;
        Ok(draft.id)
    }

    /// Turns the form into a shipment (create or update by invoice number)
    /// and deletes the draft.
    pub async fn publish(&mut self) -> ApiResult<Shipment> {
        self.ensure_open("publish")?;
        let plan = prepare_publish(&self.data)?;
        let source = PublishSource {
            draft_id: self.draft_id.clone(),
            shipment_id: self.data.source_shipment_id.clone(),
        };

        let outcome = self.db.shipments().publish(&plan, &source).await?;

        info!(
            invoice_number = %outcome.shipment.invoice_number(),
            created = outcome.created,
            draft_deleted = outcome.draft_deleted,
            "Edit session published"
        );
        self.finish(DraftState::Published);
        Ok(outcome.shipment)
    }

    /// Drops the form and its draft without touching shipments.
    pub async fn discard(&mut self) -> ApiResult<()> {
        self.ensure_open("discard")?;
        if let Some(ref id) = self.draft_id {
            match self.db.drafts().delete(id).await {
                Ok(()) | Err(DbError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(draft_id = ?self.draft_id, "Draft discarded");
        self.finish(DraftState::Discarded);
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> ApiResult<()> {
        if self.state.is_terminal() {
            return Err(CoreError::InvalidTransition {
                state: self.state.to_string(),
                action: action.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Any edit moves a saved form back to `Editing`.
    fn begin_edit(&mut self, action: &str) -> ApiResult<()> {
        self.ensure_open(action)?;
        self.state = DraftState::Editing;
        Ok(())
    }

    fn finish(&mut self, state: DraftState) {
        self.state = state;
        self.subscription = None;
    }
}
