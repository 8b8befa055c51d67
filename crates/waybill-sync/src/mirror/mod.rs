//! # Remote Mirror
//!
//! The remote side of a sync: a store that keeps one copy of every local
//! record, keyed by the record's natural key.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RemoteMirror                                                           │
//! │                                                                         │
//! │  keys(class)            → every natural key present remotely           │
//! │  count(class)           → number of remote records                     │
//! │  upsert(class, records) → insert or replace by natural key             │
//! │                                                                         │
//! │  Natural keys:                                                         │
//! │    shipments    → invoice_number (upper-cased)                         │
//! │    master data  → name_key (trimmed, lower-cased)                      │
//! │                                                                         │
//! │  Uploading a key twice replaces the first copy, never duplicates it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod http;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use waybill_core::{EntityClass, MasterRecord, Shipment};

use crate::config::{MirrorKind, WaybillConfig};
use crate::connectivity::{ConnectivityProbe, StaticProbe, TcpProbe};
use crate::error::{MirrorResult, SyncError, SyncResult};

pub use http::HttpMirror;
pub use sqlite::SqliteMirror;

/// One record as uploaded: its natural key plus the JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorRecord {
    pub key: String,
    pub payload: Value,
}

impl MirrorRecord {
    /// Full shipment document: header, boxes and products.
    pub fn from_shipment(shipment: &Shipment) -> MirrorResult<Self> {
        Ok(MirrorRecord {
            key: shipment.header.invoice_key(),
            payload: serde_json::to_value(shipment)?,
        })
    }

    /// Master record plus its `name_key` column.
    pub fn from_master(record: &MasterRecord) -> MirrorResult<Self> {
        let key = record.name_key();
        let mut payload = serde_json::to_value(record)?;
        if let Value::Object(ref mut map) = payload {
            map.insert("name_key".to_string(), Value::String(key.clone()));
        }
        Ok(MirrorRecord { key, payload })
    }
}

/// A remote store the sync engine uploads into.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Short description for logs ("http https://...", "sqlite /mnt/...").
    fn describe(&self) -> String;

    async fn count(&self, class: EntityClass) -> MirrorResult<u64>;

    async fn keys(&self, class: EntityClass) -> MirrorResult<HashSet<String>>;

    /// Returns the number of records written.
    async fn upsert(&self, class: EntityClass, records: &[MirrorRecord]) -> MirrorResult<u64>;
}

/// A mirror together with the probe that says whether it is reachable.
#[derive(Clone)]
pub struct MirrorConnection {
    pub mirror: Arc<dyn RemoteMirror>,
    pub probe: Arc<dyn ConnectivityProbe>,
}

impl std::fmt::Debug for MirrorConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorConnection")
            .field("mirror", &self.mirror.describe())
            .finish()
    }
}

/// Builds the mirror named by `[mirror]` in the configuration.
pub async fn connect(config: &WaybillConfig) -> SyncResult<MirrorConnection> {
    let settings = &config.mirror;
    match settings.kind {
        MirrorKind::Http => {
            let url = settings
                .url
                .as_deref()
                .ok_or_else(|| SyncError::InvalidConfig("mirror.url is not set".into()))?;
            let probe = TcpProbe::for_url(url, config.sync.probe_timeout()).ok_or_else(|| {
                SyncError::InvalidConfig(format!("mirror.url has no host: {url}"))
            })?;
            let mirror = HttpMirror::new(url, settings.api_key.clone(), config.sync.request_timeout())?;
            info!(url = %url, "Using HTTP mirror");
            Ok(MirrorConnection {
                mirror: Arc::new(mirror),
                probe: Arc::new(probe),
            })
        }
        MirrorKind::Sqlite => {
            let path = settings
                .path
                .as_deref()
                .ok_or_else(|| SyncError::InvalidConfig("mirror.path is not set".into()))?;
            let mirror = SqliteMirror::open(path).await?;
            info!(path = %path.display(), "Using SQLite mirror");
            Ok(MirrorConnection {
                mirror: Arc::new(mirror),
                probe: Arc::new(StaticProbe::online()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waybill_core::{MasterDataKind, ShipmentHeader};

    #[test]
    fn test_master_payload_carries_name_key() {
        let record = MasterRecord::new(MasterDataKind::Consignee, "  Miami  Imports ");
        let mirrored = MirrorRecord::from_master(&record).unwrap();
        assert_eq!(mirrored.key, "miami imports");
        assert_eq!(mirrored.payload["name_key"], "miami imports");
        assert_eq!(mirrored.payload["name"], "Miami  Imports");
    }

    #[test]
    fn test_shipment_payload_is_full_document() {
        let now = chrono::Utc::now();
        let shipment = Shipment {
            id: "s-1".into(),
            header: ShipmentHeader::new("ks1001", "Andes Flowers", "Miami Imports"),
            boxes: vec![waybill_core::ShipmentBox::new()],
            created_at: now,
            updated_at: now,
        };
        let mirrored = MirrorRecord::from_shipment(&shipment).unwrap();
        assert_eq!(mirrored.key, "KS1001");
        assert_eq!(mirrored.payload["shipper"], "Andes Flowers");
        assert_eq!(mirrored.payload["boxes"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_connect_requires_mirror_settings() {
        let config = WaybillConfig::default();
        let err = connect(&config).await.unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_connect_sqlite_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WaybillConfig::default();
        config.mirror.kind = MirrorKind::Sqlite;
        config.mirror.path = Some(dir.path().join("mirror.db"));

        let conn = connect(&config).await.unwrap();
        assert!(conn.probe.is_online().await);
        assert_eq!(conn.mirror.count(EntityClass::Shipments).await.unwrap(), 0);
    }
}
