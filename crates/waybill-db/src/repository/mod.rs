//! # Repository Module
//!
//! Local Store repositories.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppContext / SyncEngine                                               │
//! │       │                                                                 │
//! │       │  db.shipments().publish(&plan, &source)                        │
//! │       ▼                                                                 │
//! │  ShipmentRepository ──┐                                                │
//! │  DraftRepository ─────┼──► SqlitePool ──► waybill.db                   │
//! │  MasterDataRepository ┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ShipmentRepository`](shipment::ShipmentRepository) - Shipments, boxes, products, publish
//! - [`DraftRepository`](draft::DraftRepository) - Draft snapshots
//! - [`MasterDataRepository`](master_data::MasterDataRepository) - Reference data

pub mod draft;
pub mod master_data;
pub mod shipment;
