//! # Waybill Application Library
//!
//! Wires the Local Store, the Sync Engine and the in-process services into
//! one `AppContext` that a presentation layer (or the `waybill` CLI) calls.
//!
//! ## Module Organization
//! ```text
//! waybill_app/
//! ├── lib.rs          ◄─── You are here (exports, tracing setup)
//! ├── context.rs      ◄─── AppContext: store, config, broadcaster, sync
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── broadcaster.rs ◄─ Master-Data Change Broadcaster
//! │   └── session.rs  ◄─── EditSession (draft → publish state machine)
//! ├── commands/
//! │   ├── draft.rs    ◄─── save_draft, publish, discard_draft
//! │   ├── shipment.rs ◄─── shipments, compute_totals
//! │   ├── master_data.rs ◄─ master data + change subscriptions
//! │   └── sync.rs     ◄─── compute_migration_status, sync
//! ├── cli.rs          ◄─── clap command-line interface
//! └── error.rs        ◄─── ApiError { code, message }
//! ```
//!
//! ## Typical Use
//! ```rust,ignore
//! let ctx = AppContext::open(WaybillConfig::load(None)?).await?;
//!
//! let mut session = ctx.new_session();
//! session.set_header(ShipmentHeader::new("KS1001", "Andes Flowers", "Miami Imports"))?;
//! let b = session.add_box(ShipmentBox::new())?;
//! session.add_product(b, ShipmentProduct::new("Roses", Weight::from_kg(25.5), Money::from_cents(1500)))?;
//! session.save().await?;
//! let shipment = session.publish().await?;
//!
//! let report = ctx.sync().await?;
//! ```

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod state;

pub use commands::{DraftSummary, PublishRequest, ShipmentSummary, SyncStatusDto};
pub use context::AppContext;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::{EditSession, MasterDataBroadcaster, Subscription, SubscriptionId};

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=waybill_sync=trace` - Trace one crate
/// - Default: `info,waybill=debug,sqlx=warn`
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,waybill=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
