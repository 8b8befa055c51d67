//! # Drafts
//!
//! A draft is the staging copy of an invoice form: header fields, boxes
//! and the wizard step the user was on. It lives in the Local Store until
//! it is published into a `Shipment` or discarded.
//!
//! ## Lifecycle
//! ```text
//!             save()            publish()
//!  Editing ───────────► Saved ───────────► Published
//!     │   ◄─────────┐     │
//!     │   save()    └─────┤
//!     │                   │ discard()
//!     └───────────────────┴──────────────► Discarded
//! ```
//!
//! `prepare_publish` is the pure half of publishing: it validates the
//! snapshot and turns it into the header + boxes that the Local Store
//! writes in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::boxes;
use crate::error::{CoreResult, ValidationError};
use crate::lenient;
use crate::types::{Shipment, ShipmentBox, ShipmentHeader};
use crate::validation::{normalize_invoice_number, validate_boxes, validate_header};

// =============================================================================
// Draft State
// =============================================================================

/// State of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    /// Form open, nothing persisted yet (or unsaved changes on a new form).
    Editing,
    /// A draft row exists for this form.
    Saved,
    /// Terminal: the draft became a shipment.
    Published,
    /// Terminal: the draft was thrown away.
    Discarded,
}

impl DraftState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DraftState::Published | DraftState::Discarded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftState::Editing => "editing",
            DraftState::Saved => "saved",
            DraftState::Published => "published",
            DraftState::Discarded => "discarded",
        }
    }
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Draft Data
// =============================================================================

/// Snapshot of the invoice form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftData {
    #[serde(flatten)]
    pub header: ShipmentHeader,
    #[serde(default)]
    pub boxes: Vec<ShipmentBox>,
    /// Wizard step the form was on when saved.
    #[serde(default, alias = "currentStep", deserialize_with = "lenient::u32_or_zero")]
    pub current_step: u32,
    /// Shipment the form was loaded from, when editing a published invoice.
    #[serde(default, alias = "shipmentId", skip_serializing_if = "Option::is_none")]
    pub source_shipment_id: Option<String>,
}

impl DraftData {
    /// Parses a stored snapshot, tolerating legacy shapes.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let mut data: DraftData =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidFormat {
                field: "draft_data".to_string(),
                reason: e.to_string(),
            })?;
        boxes::renumber(&mut data.boxes);
        Ok(data)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| {
            ValidationError::InvalidFormat {
                field: "draft_data".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads an existing shipment into a form snapshot.
    pub fn from_shipment(shipment: &Shipment) -> Self {
        Self {
            header: shipment.header.clone(),
            boxes: boxes::load(shipment.boxes.clone()),
            current_step: 0,
            source_shipment_id: Some(shipment.id.clone()),
        }
    }

    /// Natural key the draft would publish under.
    pub fn invoice_key(&self) -> String {
        self.header.invoice_key()
    }
}

/// A persisted draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Draft {
    pub id: String,
    pub data: DraftData,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    /// Invoice number shown in draft lists, if the user typed one.
    pub fn label(&self) -> Option<&str> {
        let invoice = self.data.header.invoice_number.trim();
        (!invoice.is_empty()).then_some(invoice)
    }
}

// =============================================================================
// Publish Preparation
// =============================================================================

/// Validated content ready to be written as a shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPlan {
    /// Header with a normalized invoice number.
    pub header: ShipmentHeader,
    /// Boxes with ids assigned and numbers rewritten.
    pub boxes: Vec<ShipmentBox>,
}

impl PublishPlan {
    pub fn invoice_number(&self) -> &str {
        &self.header.invoice_number
    }
}

/// Validates a form snapshot and normalizes it for publishing.
///
/// ## Steps
/// 1. Required header fields (invoice number, shipper, consignee)
/// 2. Box list well-formed (no negative numbers)
/// 3. Invoice number trimmed and upper-cased
/// 4. Missing or repeated box/product ids replaced, boxes renumbered
///
/// Nothing is written; a failure here leaves the stores untouched.
pub fn prepare_publish(data: &DraftData) -> CoreResult<PublishPlan> {
    validate_header(&data.header)?;
    validate_boxes(&data.boxes)?;

    let mut header = data.header.clone();
    header.invoice_number = normalize_invoice_number(&header.invoice_number);
    header.shipper = header.shipper.trim().to_string();
    header.consignee = header.consignee.trim().to_string();

    let mut boxes = data.boxes.clone();
    boxes::assign_missing_ids(&mut boxes);
    boxes::renumber(&mut boxes);

    Ok(PublishPlan { header, boxes })
}
