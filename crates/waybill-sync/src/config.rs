//! # Waybill Configuration
//!
//! Configuration for the Local Store, the sync engine and the remote mirror.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     WAYBILL_MIRROR_URL=https://mirror.example.com/rest/v1              │
//! │     WAYBILL_FORCE_OFFLINE=true                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/waybill/waybill.toml (Linux)                             │
//! │     ~/Library/Application Support/com.waybill.waybill/waybill.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ./waybill.db, no mirror, batch_size 50, 10 % tax                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/waybill/waybill.db"
//!
//! [sync]
//! force_offline = false
//! batch_size = 50
//! request_timeout_secs = 30
//! probe_timeout_secs = 3
//!
//! [mirror]
//! kind = "http"          # http | sqlite
//! url = "https://mirror.example.com/rest/v1"
//! api_key = "..."
//!
//! [totals]
//! tax_rate_bps = 1000
//! discount_cents = 0
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use waybill_core::{Money, TaxRate, TotalsPolicy};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("waybill.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Start with sync disabled regardless of connectivity.
    /// Can be toggled at runtime on the engine.
    #[serde(default)]
    pub force_offline: bool,

    /// Number of records sent per mirror request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout for one mirror request (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the connectivity probe (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    50
}
fn default_request_timeout() -> u64 {
    30
}
fn default_probe_timeout() -> u64 {
    3
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            force_offline: false,
            batch_size: default_batch_size(),
            request_timeout_secs: default_request_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl SyncSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// =============================================================================
// Mirror Settings
// =============================================================================

/// Which remote mirror implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorKind {
    /// PostgREST-compatible REST endpoint.
    #[default]
    Http,

    /// A second SQLite file (backup drive, network share).
    Sqlite,
}

impl std::fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorKind::Http => write!(f, "http"),
            MirrorKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for MirrorKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "https" | "rest" => Ok(MirrorKind::Http),
            "sqlite" | "file" => Ok(MirrorKind::Sqlite),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown mirror kind: '{}'. Valid options: http, sqlite",
                other
            ))),
        }
    }
}

/// Remote mirror connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorSettings {
    #[serde(default)]
    pub kind: MirrorKind,

    /// Base URL of the REST endpoint (`kind = "http"`).
    #[serde(default)]
    pub url: Option<String>,

    /// Sent as `apikey` and bearer token (`kind = "http"`).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Mirror database file (`kind = "sqlite"`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl MirrorSettings {
    /// True when enough is set to build a mirror.
    pub fn is_configured(&self) -> bool {
        match self.kind {
            MirrorKind::Http => self.url.is_some(),
            MirrorKind::Sqlite => self.path.is_some(),
        }
    }
}

// =============================================================================
// Totals Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsSettings {
    /// Tax rate in basis points (1000 = 10 %).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    #[serde(default)]
    pub discount_cents: i64,
}

fn default_tax_rate_bps() -> u32 {
    1000
}

impl Default for TotalsSettings {
    fn default() -> Self {
        TotalsSettings {
            tax_rate_bps: default_tax_rate_bps(),
            discount_cents: 0,
        }
    }
}

impl TotalsSettings {
    pub fn policy(&self) -> TotalsPolicy {
        TotalsPolicy {
            tax_rate: TaxRate::from_bps(self.tax_rate_bps),
            discount: Money::from_cents(self.discount_cents),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Waybill configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaybillConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub mirror: MirrorSettings,

    #[serde(default)]
    pub totals: TotalsSettings,
}

impl WaybillConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (waybill.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig("database.path must not be empty".into()));
        }

        if let Some(ref url) = self.mirror.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::InvalidConfig(format!(
                    "Mirror URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }

        if self.sync.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.totals.discount_cents < 0 {
            return Err(SyncError::InvalidConfig(
                "discount_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("WAYBILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(kind) = std::env::var("WAYBILL_MIRROR_KIND") {
            match kind.parse() {
                Ok(parsed) => self.mirror.kind = parsed,
                Err(_) => warn!(kind = %kind, "Unknown mirror kind in environment"),
            }
        }

        if let Ok(url) = std::env::var("WAYBILL_MIRROR_URL") {
            debug!(url = %url, "Overriding mirror URL from environment");
            self.mirror.url = Some(url);
        }

        if let Ok(key) = std::env::var("WAYBILL_MIRROR_API_KEY") {
            self.mirror.api_key = Some(key);
        }

        if let Ok(path) = std::env::var("WAYBILL_MIRROR_PATH") {
            self.mirror.path = Some(PathBuf::from(path));
        }

        if let Ok(value) = std::env::var("WAYBILL_FORCE_OFFLINE") {
            self.sync.force_offline = matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(size) = std::env::var("WAYBILL_BATCH_SIZE") {
            if let Ok(n) = size.parse::<usize>() {
                self.sync.batch_size = n;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "waybill", "waybill")
            .map(|dirs| dirs.config_dir().join("waybill.toml"))
    }

    pub fn totals_policy(&self) -> TotalsPolicy {
        self.totals.policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_kind_parsing() {
        assert_eq!("http".parse::<MirrorKind>().unwrap(), MirrorKind::Http);
        assert_eq!("REST".parse::<MirrorKind>().unwrap(), MirrorKind::Http);
        assert_eq!("sqlite".parse::<MirrorKind>().unwrap(), MirrorKind::Sqlite);
        assert!("ftp".parse::<MirrorKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = WaybillConfig::default();
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.sync.request_timeout_secs, 30);
        assert!(!config.sync.force_offline);
        assert!(!config.mirror.is_configured());
        assert_eq!(config.totals_policy(), TotalsPolicy::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WaybillConfig::default();
        assert!(config.validate().is_ok());

        config.mirror.url = Some("ftp://mirror".into());
        assert!(config.validate().is_err());

        config.mirror.url = Some("https://mirror.example.com/rest/v1".into());
        assert!(config.validate().is_ok());
        assert!(config.mirror.is_configured());

        config.sync.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waybill.toml");
        std::fs::write(
            &path,
            "[mirror]\nkind = \"sqlite\"\npath = \"/mnt/backup/mirror.db\"\n\n[totals]\ntax_rate_bps = 1500\n",
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let config: WaybillConfig = toml::from_str(&contents).unwrap();
        assert_eq!(config.mirror.kind, MirrorKind::Sqlite);
        assert!(config.mirror.is_configured());
        assert_eq!(config.totals.tax_rate_bps, 1500);
        assert_eq!(config.sync.batch_size, 50);
        assert_eq!(config.database.path, PathBuf::from("waybill.db"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("waybill.toml");

        let mut config = WaybillConfig::default();
        config.sync.batch_size = 25;
        config.mirror.url = Some("http://localhost:3000".into());
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[sync]"));
        assert!(contents.contains("[mirror]"));
        let loaded: WaybillConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.sync.batch_size, 25);
        assert_eq!(loaded.mirror.url.as_deref(), Some("http://localhost:3000"));
    }
}
