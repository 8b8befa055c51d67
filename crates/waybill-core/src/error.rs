//! # Error Types
//!
//! Domain-specific error types for waybill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  waybill-core errors (this file)                                       │
//! │  ├── CoreError        - Domain / lifecycle errors                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  waybill-db errors          └── DbError    - Local Store failures      │
//! │  waybill-sync errors        └── SyncError  - Mirror / sync failures    │
//! │  waybill app errors         └── ApiError   - What the UI sees          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A shipment with the given invoice number does not exist.
    #[error("Shipment not found: {0}")]
    ShipmentNotFound(String),

    /// A draft with the given id does not exist.
    #[error("Draft not found: {0}")]
    DraftNotFound(String),

    /// The normalized invoice number is already owned by another shipment.
    ///
    /// ## When This Occurs
    /// - Creating a shipment whose invoice number already exists
    /// - Renaming an existing shipment onto another shipment's number
    #[error("Invoice number {invoice_number} already exists")]
    Conflict { invoice_number: String },

    /// An edit session was asked to do something its state forbids.
    ///
    /// ```text
    /// Editing ──save──► Saved ──publish──► Published
    ///    │                 │
    ///    └────discard──────┴──────────────► Discarded
    ///
    /// publish() on Published  → InvalidTransition
    /// save() on Discarded     → InvalidTransition
    /// ```
    #[error("Cannot {action} while session is {state}")]
    InvalidTransition { state: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens, so a failed validation never leaves a
/// partial record behind.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. invoice number with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Index into boxes/products is out of range.
    #[error("{field} index {index} is out of range (len {len})")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
