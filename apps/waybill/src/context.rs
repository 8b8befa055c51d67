//! # Application Context
//!
//! Owns everything a presentation layer talks to: the Local Store, the
//! loaded configuration, the Master-Data Change Broadcaster and, when a
//! mirror is configured, the Sync Engine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AppContext                                    │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────────────┐ ┌───────────────┐ │
//! │  │  Database    │ │ WaybillConfig│ │ MasterData    │ │ SyncEngine    │ │
//! │  │  (pool,      │ │ (read-only   │ │ Broadcaster   │ │ Arc, optional │ │
//! │  │   cheap to   │ │  after open) │ │ (shared       │ │               │ │
//! │  │   clone)     │ │              │ │  registry)    │ │               │ │
//! │  └──────────────┘ └──────────────┘ └───────────────┘ └───────────────┘ │
//! │                                                                         │
//! │  Operations live in commands/ as `impl AppContext` blocks.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing or unusable mirror never blocks local work: drafts, publish and
//! totals keep working and only the sync operations report the problem.

use std::sync::Arc;
use tracing::{info, warn};
use waybill_core::TotalsPolicy;
use waybill_db::{Database, DbConfig};
use waybill_sync::{SyncEngine, WaybillConfig};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::MasterDataBroadcaster;

/// Shared application state.
#[derive(Debug)]
pub struct AppContext {
    pub(crate) db: Database,
    pub(crate) config: WaybillConfig,
    pub(crate) broadcaster: MasterDataBroadcaster,
    sync: Result<Arc<SyncEngine>, ApiError>,
}

impl AppContext {
    /// Opens the Local Store named in `config` and connects the mirror.
    pub async fn open(config: WaybillConfig) -> ApiResult<Self> {
        let db = Database::new(DbConfig::new(&config.database.path)).await?;
        info!(path = %config.database.path.display(), "Local store opened");

        let sync = if config.mirror.is_configured() {
            match SyncEngine::from_config(db.clone(), &config).await {
                Ok(engine) => Ok(Arc::new(engine)),
                Err(e) => {
                    warn!(error = %e, "Remote mirror unavailable");
                    Err(ApiError::from(e))
                }
            }
        } else {
            info!("No remote mirror configured");
            Err(not_configured())
        };

        Ok(AppContext {
            db,
            config,
            broadcaster: MasterDataBroadcaster::new(),
            sync,
        })
    }

    /// Builds a context from parts already opened by the caller.
    pub fn new(db: Database, config: WaybillConfig, sync: Option<Arc<SyncEngine>>) -> Self {
        AppContext {
            db,
            config,
            broadcaster: MasterDataBroadcaster::new(),
            sync: sync.ok_or_else(not_configured),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &WaybillConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &MasterDataBroadcaster {
        &self.broadcaster
    }

    /// Tax and discount applied by `compute_totals`.
    pub fn totals_policy(&self) -> TotalsPolicy {
        self.config.totals_policy()
    }

    /// The engine, or why there is none.
    pub fn sync_engine(&self) -> ApiResult<&Arc<SyncEngine>> {
        self.sync.as_ref().map_err(Clone::clone)
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

fn not_configured() -> ApiError {
    ApiError::new(
        ErrorCode::SyncError,
        "No remote mirror configured (set [mirror] in waybill.toml)",
    )
}
