//! # API Error Type
//!
//! Unified error type for application commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Waybill                                │
//! │                                                                         │
//! │  Presentation layer          Rust Backend                               │
//! │  ──────────────────          ────────────                               │
//! │                                                                         │
//! │  ctx.publish(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command → Result<T, ApiError>                                   │  │
//! │  │                                                                  │  │
//! │  │  CoreError::Validation ─────────► VALIDATION_ERROR               │  │
//! │  │  CoreError::Conflict ───────────► CONFLICT                       │  │
//! │  │  CoreError::InvalidTransition ──► INVALID_STATE                  │  │
//! │  │  DbError::NotFound ─────────────► NOT_FOUND                      │  │
//! │  │  DbError::(anything else) ──────► STORAGE_ERROR (logged)         │  │
//! │  │  SyncError::Offline ────────────► OFFLINE                        │  │
//! │  │  SyncError::(mirror, timeout) ──► SYNC_ERROR                     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-class sync failures are not errors: they come back inside the
//! `SyncReport`.

use serde::Serialize;
use waybill_core::{CoreError, ValidationError};
use waybill_db::DbError;
use waybill_sync::SyncError;

/// Result alias for application commands.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from application commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CONFLICT",
///   "message": "Invoice number KS1001 already exists"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Required field missing or malformed input
    ValidationError,

    /// Natural-key collision (invoice number, master-data name)
    Conflict,

    /// No connectivity, or force-offline is set
    Offline,

    /// Local Store failure
    StorageError,

    NotFound,

    /// Operation not allowed in the session's current state
    InvalidState,

    /// Remote mirror or sync configuration failure
    SyncError,

    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Offline => "OFFLINE",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::SyncError => "SYNC_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ShipmentNotFound(invoice) => ApiError::not_found("Shipment", &invoice),
            CoreError::DraftNotFound(id) => ApiError::not_found("Draft", &id),
            CoreError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            CoreError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidState, err.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            e @ DbError::UniqueViolation { .. } if e.is_conflict() => {
                ApiError::new(ErrorCode::Conflict, e.to_string())
            }
            DbError::UniqueViolation { field, .. } => {
                tracing::error!("Unique constraint failed on {}", field);
                ApiError::new(ErrorCode::StorageError, "Database operation failed")
            }
            DbError::Core(e) => e.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::StorageError, "Invalid reference")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored document unreadable: {}", e);
                ApiError::new(ErrorCode::StorageError, format!("Stored data is unreadable: {e}"))
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::StorageError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::StorageError, "Database operation failed")
            }
        }
    }
}

/// Converts sync errors to API errors.
impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Offline(_) => ApiError::new(ErrorCode::Offline, err.to_string()),
            SyncError::Storage(e) => e.into(),
            other => {
                tracing::warn!("Sync failed: {}", other);
                ApiError::new(ErrorCode::SyncError, other.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake_case() {
        let err = ApiError::new(ErrorCode::ValidationError, "shipper is required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "shipper is required");
        assert_eq!(
            serde_json::to_value(ErrorCode::InvalidState).unwrap(),
            ErrorCode::InvalidState.as_str()
        );
    }

    #[test]
    fn test_core_conversions() {
        let err: ApiError = CoreError::Conflict {
            invoice_number: "KS1001".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "Invoice number KS1001 already exists");

        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "consignee".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "consignee is required");
    }

    #[test]
    fn test_db_conversions() {
        let err: ApiError = DbError::not_found("Draft", "abc").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ApiError = DbError::Core(CoreError::Conflict {
            invoice_number: "KS1001".into(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err: ApiError = DbError::duplicate("shipments.invoice_number", "KS1001").into();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err: ApiError = DbError::UniqueViolation {
            field: "shipment_boxes.id".into(),
            value: None,
        }
        .into();
        assert_eq!(err.code, ErrorCode::StorageError);

        let err: ApiError = DbError::QueryFailed("disk I/O error".into()).into();
        assert_eq!(err.code, ErrorCode::StorageError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_sync_conversions() {
        let err: ApiError = SyncError::Offline("force-offline is enabled".into()).into();
        assert_eq!(err.code, ErrorCode::Offline);
        assert_eq!(err.to_string(), "[OFFLINE] Offline: force-offline is enabled");

        let err: ApiError = SyncError::Timeout(30).into();
        assert_eq!(err.code, ErrorCode::SyncError);

        let err: ApiError = SyncError::Storage(DbError::not_found("Shipment", "KS1")).into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
