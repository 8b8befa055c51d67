//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Connectivity   │  │     Remote Mirror       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Offline        │  │  Mirror(MirrorError)    │ │
//! │  │  ConfigLoad     │  │  Timeout        │  │   Http / Status         │ │
//! │  │  ConfigSave     │  │                 │  │   InvalidResponse       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │   Local Store   │   Per-class upload failures are NOT errors here:  │
//! │  │                 │   they are collected into the SyncReport.         │
//! │  │  Storage(DbErr) │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use waybill_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for remote mirror calls.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Sync error type covering every failure that aborts a sync.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Connectivity Errors
    // =========================================================================
    /// No connectivity, or force-offline is set. Raised before any remote
    /// call; local state is untouched.
    #[error("Offline: {0}")]
    Offline(String),

    #[error("Remote mirror did not answer within {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Remote / Local
    // =========================================================================
    #[error("Remote mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Local store error: {0}")]
    Storage(#[from] DbError),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

/// Failures talking to a remote mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Transport failure (DNS, TLS, connection reset...).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The mirror answered with a non-success status.
    #[error("Mirror returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The mirror answered with something we could not read.
    #[error("Invalid mirror response: {0}")]
    InvalidResponse(String),

    /// Failure in the file-backed mirror.
    #[error("Mirror database error: {0}")]
    Database(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MirrorError::InvalidResponse(err.to_string())
        } else {
            MirrorError::Http(err.to_string())
        }
    }
}

impl From<sqlx::Error> for MirrorError {
    fn from(err: sqlx::Error) -> Self {
        MirrorError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::InvalidResponse(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if running the sync again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Offline(_) | SyncError::Timeout(_) => true,
            SyncError::Mirror(err) => err.is_retryable(),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

impl MirrorError {
    /// Transport failures and 5xx/429 answers are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            MirrorError::Http(_) => true,
            MirrorError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
