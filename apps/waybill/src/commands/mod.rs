//! # Commands Module
//!
//! Every operation exposed to the presentation layer, as `impl AppContext`
//! blocks grouped by concern.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here
//! ├── draft.rs        ◄─── save_draft, publish, discard_draft, sessions
//! ├── shipment.rs     ◄─── create/list/get/delete shipments, compute_totals
//! ├── master_data.rs  ◄─── save/delete master data, change subscriptions
//! └── sync.rs         ◄─── compute_migration_status, sync, force-offline
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Presentation layer                                                     │
//! │  ──────────────────                                                     │
//! │  ctx.publish(PublishRequest::Draft(id)).await                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  impl AppContext {                                                      │
//! │      pub async fn publish(&self, ..) -> ApiResult<Shipment>             │
//! │  }                                                                      │
//! │         │                                                               │
//! │         │ (errors converted to ApiError { code, message })              │
//! │         ▼                                                               │
//! │  Caller receives Shipment, or a code it can branch on                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! List results are small DTOs with camelCase serialization; full entities
//! come straight from `waybill-core`.

pub mod draft;
pub mod master_data;
pub mod shipment;
pub mod sync;

pub use draft::{DraftSummary, PublishRequest};
pub use shipment::ShipmentSummary;
pub use sync::SyncStatusDto;
