//! # Sync Engine
//!
//! One-directional reconciliation: Local Store → Remote Mirror, run when the
//! user asks for it.
//!
//! ## Sync Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sync()                                                                 │
//! │    │                                                                    │
//! │    ├── force-offline or probe says offline ──► Err(Offline)            │
//! │    │                                          (nothing read, nothing   │
//! │    │                                           written)                │
//! │    ├── local shipments == 0 ──► SyncReport { skipped: true }           │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  for class in Shippers → Consignees → ProductTypes → FlowerTypes       │
//! │               → Shipments:                                             │
//! │    remote = mirror.keys(class)                                         │
//! │    pending = local keys − remote                                       │
//! │    for batch in pending.chunks(batch_size):                            │
//! │        timeout(request_timeout, mirror.upsert(class, batch))           │
//! │          ok  → uploaded[class] += n                                    │
//! │          err → failed[class] += n, record SyncFailure, keep going      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uploads are keyed by natural key, so running sync again after a partial
//! failure only sends what is still missing. Dropping the future mid-sync
//! leaves already-sent batches on the mirror.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use waybill_core::{EntityClass, EntityCounts};
use waybill_db::Database;

use crate::config::{SyncSettings, WaybillConfig};
use crate::connectivity::ConnectivityProbe;
use crate::error::{MirrorResult, SyncError, SyncResult};
use crate::mirror::{self, MirrorRecord, RemoteMirror};

// =============================================================================
// Reports
// =============================================================================

/// Local and remote record counts, and what a sync would upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// True once no local shipment is missing from the mirror.
    pub has_migrated: bool,
    pub local: EntityCounts,
    pub remote: EntityCounts,
    /// Local records whose natural key is absent remotely.
    pub pending: EntityCounts,
}

/// One class (or one batch of a class) that failed to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub class: EntityClass,
    pub message: String,
    pub records: u64,
}

/// Outcome of a completed sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub uploaded: EntityCounts,
    pub failed: EntityCounts,
    pub failures: Vec<SyncFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when there was nothing to sync and the mirror was not contacted.
    pub skipped: bool,
}

impl SyncReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        SyncReport {
            uploaded: EntityCounts::default(),
            failed: EntityCounts::default(),
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
            skipped: false,
        }
    }

    fn record_failure(&mut self, class: EntityClass, message: String, records: u64) {
        self.failed.add(class, records);
        self.failures.push(SyncFailure {
            class,
            message,
            records,
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The aggregate error when any class failed.
    pub fn partial_failure(&self) -> Option<PartialSyncError> {
        if self.failures.is_empty() {
            return None;
        }
        let mut classes: Vec<EntityClass> = self.failures.iter().map(|f| f.class).collect();
        classes.dedup();
        Some(PartialSyncError {
            failed: self.failed.total(),
            classes: classes
                .iter()
                .map(EntityClass::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            failures: self.failures.clone(),
        })
    }
}

/// One or more classes did not fully upload.
#[derive(Debug, Clone, Error)]
#[error("Sync incomplete: {failed} record(s) failed ({classes})")]
pub struct PartialSyncError {
    pub failed: u64,
    pub classes: String,
    pub failures: Vec<SyncFailure>,
}

// =============================================================================
// Engine
// =============================================================================

/// Reconciles the Local Store with a Remote Mirror.
pub struct SyncEngine {
    db: Database,
    mirror: Arc<dyn RemoteMirror>,
    probe: Arc<dyn ConnectivityProbe>,
    settings: SyncSettings,
    force_offline: AtomicBool,
    /// One sync at a time.
    running: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("mirror", &self.mirror.describe())
            .field("settings", &self.settings)
            .field("force_offline", &self.is_force_offline())
            .finish()
    }
}

impl SyncEngine {
    pub fn new(
        db: Database,
        mirror: Arc<dyn RemoteMirror>,
        probe: Arc<dyn ConnectivityProbe>,
        settings: SyncSettings,
    ) -> Self {
        let force_offline = AtomicBool::new(settings.force_offline);
        SyncEngine {
            db,
            mirror,
            probe,
            settings,
            force_offline,
            running: Mutex::new(()),
        }
    }

    /// Builds the engine with the mirror named in the configuration.
    pub async fn from_config(db: Database, config: &WaybillConfig) -> SyncResult<Self> {
        let conn = mirror::connect(config).await?;
        Ok(Self::new(db, conn.mirror, conn.probe, config.sync.clone()))
    }

    pub fn set_force_offline(&self, offline: bool) {
        info!(offline, "Force-offline toggled");
        self.force_offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_force_offline(&self) -> bool {
        self.force_offline.load(Ordering::SeqCst)
    }

    pub fn mirror(&self) -> &Arc<dyn RemoteMirror> {
        &self.mirror
    }

    /// Fails with `Offline` unless the mirror is reachable and sync is allowed.
    pub async fn ensure_online(&self) -> SyncResult<()> {
        if self.is_force_offline() {
            return Err(SyncError::Offline("force-offline is enabled".into()));
        }
        if !self.probe.is_online().await {
            return Err(SyncError::Offline(format!(
                "{} is unreachable",
                self.mirror.describe()
            )));
        }
        Ok(())
    }

    /// Compares local and remote record sets.
    ///
    /// Needs the mirror: fails with `Offline` when it cannot be reached.
    pub async fn compute_migration_status(&self) -> SyncResult<MigrationStatus> {
        self.ensure_online().await?;

        let local = self.db.entity_counts().await?;
        let mut remote = EntityCounts::default();
        let mut pending = EntityCounts::default();

        for class in EntityClass::SYNC_ORDER {
            remote.set(class, self.timed(self.mirror.count(class)).await?);
            let remote_keys = self.timed(self.mirror.keys(class)).await?;
            let missing = self
                .local_keys(class)
                .await?
                .iter()
                .filter(|key| !remote_keys.contains(*key))
                .count();
            pending.set(class, missing as u64);
        }

        let status = MigrationStatus {
            has_migrated: pending.shipments == 0,
            local,
            remote,
            pending,
        };
        debug!(?status, "Computed migration status");
        Ok(status)
    }

    /// Uploads every local record missing from the mirror.
    ///
    /// `Err` only for conditions that stop the whole run (offline, local
    /// store failure); per-class upload failures are in the report.
    pub async fn sync(&self) -> SyncResult<SyncReport> {
        self.ensure_online().await?;
        let _guard = self.running.lock().await;

        let mut report = SyncReport::new(Utc::now());
        let local = self.db.entity_counts().await?;

        if local.shipments == 0 {
            info!("No local shipments, nothing to sync");
            report.skipped = true;
            report.finished_at = Utc::now();
            return Ok(report);
        }

        info!(mirror = %self.mirror.describe(), local = %local, "Starting sync");

        for class in EntityClass::SYNC_ORDER {
            self.sync_class(class, &mut report).await?;
        }

        report.finished_at = Utc::now();
        if report.is_complete() {
            info!(uploaded = %report.uploaded, "Sync complete");
        } else {
            warn!(
                uploaded = %report.uploaded,
                failed = %report.failed,
                "Sync finished with failures"
            );
        }
        Ok(report)
    }

    async fn sync_class(&self, class: EntityClass, report: &mut SyncReport) -> SyncResult<()> {
        let local_keys = self.local_keys(class).await?;
        if local_keys.is_empty() {
            return Ok(());
        }

        let remote_keys = match self.timed(self.mirror.keys(class)).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(class = %class, error = %e, "Could not list remote keys");
                report.record_failure(class, e.to_string(), local_keys.len() as u64);
                return Ok(());
            }
        };

        let pending: Vec<String> = local_keys
            .into_iter()
            .filter(|key| !remote_keys.contains(key))
            .collect();
        if pending.is_empty() {
            debug!(class = %class, "Already mirrored");
            return Ok(());
        }

        let records = match self.load_records(class, &pending).await? {
            Ok(records) => records,
            Err(e) => {
                report.record_failure(class, e.to_string(), pending.len() as u64);
                return Ok(());
            }
        };

        for batch in records.chunks(self.settings.batch_size.max(1)) {
            let size = batch.len() as u64;
            match self.timed(self.mirror.upsert(class, batch)).await {
                Ok(_) => {
                    debug!(class = %class, records = size, "Batch uploaded");
                    report.uploaded.add(class, size);
                }
                Err(e) => {
                    warn!(class = %class, records = size, error = %e, "Batch failed");
                    report.record_failure(class, e.to_string(), size);
                }
            }
        }
        Ok(())
    }

    /// Natural keys of every local record of a class.
    async fn local_keys(&self, class: EntityClass) -> SyncResult<Vec<String>> {
        let keys = match class.master_kind() {
            Some(kind) => self.db.master_data().name_keys(kind).await?,
            None => self.db.shipments().invoice_numbers().await?,
        };
        Ok(keys)
    }

    /// Documents to upload. The outer error is a local store failure (aborts
    /// the sync); the inner one is a payload that could not be built.
    async fn load_records(
        &self,
        class: EntityClass,
        keys: &[String],
    ) -> SyncResult<MirrorResult<Vec<MirrorRecord>>> {
        match class.master_kind() {
            Some(kind) => {
                let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
                let records = self.db.master_data().list(kind).await?;
                Ok(records
                    .iter()
                    .filter(|r| wanted.contains(r.name_key().as_str()))
                    .map(MirrorRecord::from_master)
                    .collect())
            }
            None => {
                let shipments = self.db.shipments().list_by_invoices(keys).await?;
                Ok(shipments.iter().map(MirrorRecord::from_shipment).collect())
            }
        }
    }

    /// Runs one mirror call under the per-request timeout.
    async fn timed<T>(&self, call: impl Future<Output = MirrorResult<T>>) -> SyncResult<T> {
        match tokio::time::timeout(self.settings.request_timeout(), call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::Timeout(self.settings.request_timeout_secs)),
        }
    }
}
