//! # Sync Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Commands                                    │
//! │                                                                         │
//! │  sync_status()               - Mirror, force-offline flag              │
//! │  compute_migration_status()  - Local vs remote counts, pending         │
//! │  sync()                      - Upload missing records, SyncReport      │
//! │  set_force_offline()         - Toggle the runtime offline override     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use waybill_sync::{MigrationStatus, SyncReport};

use crate::context::AppContext;
use crate::error::ApiResult;

/// Sync configuration as the presentation layer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusDto {
    /// Whether a usable mirror is set up
    pub configured: bool,

    /// Mirror description, e.g. `http https://api.example.com/rest/v1`
    pub mirror: Option<String>,

    pub force_offline: bool,

    /// Why sync is unavailable, when it is
    pub unavailable_reason: Option<String>,
}

impl AppContext {
    pub fn sync_status(&self) -> SyncStatusDto {
        match self.sync_engine() {
            Ok(engine) => SyncStatusDto {
                configured: true,
                mirror: Some(engine.mirror().describe()),
                force_offline: engine.is_force_offline(),
                unavailable_reason: None,
            },
            Err(e) => SyncStatusDto {
                configured: false,
                mirror: None,
                force_offline: self.config.sync.force_offline,
                unavailable_reason: Some(e.message),
            },
        }
    }

    /// Compares local and remote record counts.
    pub async fn compute_migration_status(&self) -> ApiResult<MigrationStatus> {
        debug!("compute_migration_status command");
        Ok(self.sync_engine()?.compute_migration_status().await?)
    }

    /// Uploads every local record the mirror does not have yet.
    ///
    /// Per-class failures come back inside the report.
    pub async fn sync(&self) -> ApiResult<SyncReport> {
        debug!("sync command");
        let report = self.sync_engine()?.sync().await?;
        if let Some(partial) = report.partial_failure() {
            warn!(error = %partial, "Sync incomplete");
        }
        Ok(report)
    }

    pub fn set_force_offline(&self, offline: bool) -> ApiResult<()> {
        self.sync_engine()?.set_force_offline(offline);
        Ok(())
    }
}
