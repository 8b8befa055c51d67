//! # waybill-sync: Sync Engine for Waybill
//!
//! Uploads the Local Store into a Remote Mirror when the user asks for it.
//! The Local Store stays the single source of truth; nothing flows back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sync Architecture                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncEngine (engine.rs)                      │  │
//! │  │                                                                  │  │
//! │  │  compute_migration_status()      sync() → SyncReport             │  │
//! │  │  force-offline flag              per-class failure collection    │  │
//! │  └───────────────┬───────────────────────────────┬──────────────────┘  │
//! │                  │                               │                      │
//! │                  ▼                               ▼                      │
//! │  ┌────────────────────────────┐   ┌────────────────────────────────┐   │
//! │  │   waybill-db::Database     │   │  RemoteMirror (mirror/)        │   │
//! │  │                            │   │                                │   │
//! │  │  entity counts             │   │  HttpMirror   (REST endpoint)  │   │
//! │  │  natural keys per class    │   │  SqliteMirror (backup file)    │   │
//! │  │  shipment documents        │   │                                │   │
//! │  └────────────────────────────┘   └────────────────────────────────┘   │
//! │                                                                         │
//! │  ConnectivityProbe (connectivity.rs): TcpProbe / StaticProbe           │
//! │  WaybillConfig (config.rs): TOML file + WAYBILL_* environment          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Configuration (database path, sync, mirror, totals)
//! - [`connectivity`] - Reachability checks
//! - [`engine`] - `SyncEngine`, `MigrationStatus`, `SyncReport`
//! - [`error`] - Sync error types
//! - [`mirror`] - `RemoteMirror` trait and implementations

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod mirror;

pub use config::{MirrorKind, WaybillConfig};
pub use connectivity::{ConnectivityProbe, StaticProbe, TcpProbe};
pub use engine::{MigrationStatus, PartialSyncError, SyncEngine, SyncFailure, SyncReport};
pub use error::{MirrorError, MirrorResult, SyncError, SyncResult};
pub use mirror::{HttpMirror, MirrorConnection, MirrorRecord, RemoteMirror, SqliteMirror};
