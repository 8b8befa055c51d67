//! # waybill-db: Local Store for Waybill
//!
//! SQLite persistence for shipments, drafts and master data. Every read and
//! write of the application goes here first; the remote mirror only ever
//! receives copies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Waybill Data Flow                                │
//! │                                                                         │
//! │  EditSession.publish()                SyncEngine.sync()                │
//! │       │                                    │ reads committed rows       │
//! │       ▼                                    ▼                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    waybill-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ Shipment       │   │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │    │ Draft          │   │ 001_init.sql │   │   │
//! │  │   │               │    │ MasterData     │   │              │   │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  waybill.db (SQLite, WAL)                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use waybill_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("waybill.db")).await?;
//! let shipment = db.shipments().get_by_invoice("ks1001").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::draft::DraftRepository;
pub use repository::master_data::MasterDataRepository;
pub use repository::shipment::{PublishOutcome, PublishSource, ShipmentRepository};
