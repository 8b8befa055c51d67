//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (publish validation)    │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ◄──────────────────┘                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in app) ← Serialized for the presentation layer             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use waybill_core::CoreError;

/// Column holding the shipment natural key, as SQLite names it in
/// constraint messages.
pub const INVOICE_NUMBER_FIELD: &str = "shipments.invoice_number";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating a shipment whose invoice number exists
    /// - Two master records of one kind with the same name key
    ///
    /// `value` is unknown when the violation comes from SQLite.
    #[error("Duplicate {field}{}", .value.as_deref().map(|v| format!(": '{v}' already exists")).unwrap_or_default())]
    UniqueViolation { field: String, value: Option<String> },

    /// Foreign key constraint violation (box without shipment, etc.).
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored JSON document (draft snapshot) could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Domain rule rejected the write (validation, conflict).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// True for invoice-number collisions, whether caught by SQLite or by
    /// the publish existence check. Other unique violations are storage
    /// faults, not conflicts.
    pub fn is_conflict(&self) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => field == INVOICE_NUMBER_FIELD,
            DbError::Core(CoreError::Conflict { .. }) => true,
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field, value: None }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Serialization(format!("column {index}: {source}"))
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        assert!(DbError::duplicate(INVOICE_NUMBER_FIELD, "KS1001").is_conflict());
        assert!(!DbError::duplicate("shipment_boxes.id", "b-1").is_conflict());
        assert!(!DbError::duplicate("master_data.kind, master_data.name_key", "x").is_conflict());
        assert!(DbError::Core(CoreError::Conflict {
            invoice_number: "KS1001".into()
        })
        .is_conflict());
        assert!(!DbError::not_found("Shipment", "KS1001").is_conflict());
    }

    #[tokio::test]
    async fn test_sqlite_unique_violation_names_the_column() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE shipment_boxes (id TEXT PRIMARY KEY)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO shipment_boxes (id) VALUES ('b-1')")
            .execute(&mut conn)
            .await
            .unwrap();
        let err: DbError = sqlx::query("INSERT INTO shipment_boxes (id) VALUES ('b-1')")
            .execute(&mut conn)
            .await
            .unwrap_err()
            .into();

        assert!(matches!(
            &err,
            DbError::UniqueViolation { field, value: None } if field == "shipment_boxes.id"
        ));
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "Duplicate shipment_boxes.id");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DbError::not_found("Draft", "abc").to_string(),
            "Draft not found: abc"
        );
        assert_eq!(
            DbError::duplicate(INVOICE_NUMBER_FIELD, "KS1001").to_string(),
            "Duplicate shipments.invoice_number: 'KS1001' already exists"
        );
        assert_eq!(
            DbError::Core(CoreError::Conflict {
                invoice_number: "KS1001".into()
            })
            .to_string(),
            "Invoice number KS1001 already exists"
        );
    }
}
