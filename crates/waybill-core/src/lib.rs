//! # waybill-core: Pure Business Logic for Waybill
//!
//! Entity model, arithmetic and draft rules for shipment invoices, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Waybill Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation layer (forms, exports)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     apps/waybill: AppContext, EditSession, Broadcaster          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ waybill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │  types  │ │  money  │ │ totals  │ │  draft  │ │validation│ │   │
//! │  │   │Shipment │ │ Money   │ │ Totals  │ │DraftData│ │  rules   │ │   │
//! │  │   │  Box    │ │ TaxRate │ │ Policy  │ │ publish │ │normalize │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            waybill-db (Local Store) / waybill-sync              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Shipment, boxes, products, master data, sync classes
//! - [`money`] / [`weight`] - Integer cents and grams
//! - [`totals`] - Derived invoice totals
//! - [`boxes`] - Box list edits that keep numbering contiguous
//! - [`draft`] - Draft snapshots, edit states, publish preparation
//! - [`validation`] - Normalization and business rule validation
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod boxes;
pub mod draft;
pub mod error;
pub(crate) mod lenient;
pub mod money;
pub mod totals;
pub mod types;
pub mod validation;
pub mod weight;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{prepare_publish, Draft, DraftData, DraftState, PublishPlan};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use totals::{compute_totals, compute_totals_with, Totals, TotalsPolicy};
pub use types::*;
pub use weight::Weight;
