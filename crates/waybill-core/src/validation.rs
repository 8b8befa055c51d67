//! # Validation Module
//!
//! Input normalization and validation for Waybill.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form layer                                                   │
//! │  └── Blank checks, immediate feedback                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Publish (Rust)                                               │
//! │  ├── Deserialization (lenient, see `lenient`)                          │
//! │  └── THIS MODULE: required fields, formats, non-negative numbers       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (invoice_number), UNIQUE (kind, name_key)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{MasterRecord, ShipmentBox, ShipmentHeader, ShipmentProduct};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_INVOICE_NUMBER_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// Normalization
// =============================================================================

/// Canonical form of an invoice number: trimmed and upper-cased.
///
/// ```rust
/// use waybill_core::validation::normalize_invoice_number;
///
/// assert_eq!(normalize_invoice_number(" ks1001 "), "KS1001");
/// ```
pub fn normalize_invoice_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Canonical form of a master-data name: trimmed, inner whitespace
/// collapsed, lower-cased.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// String Validators
// =============================================================================

/// Fails with `Required` when the value is blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an invoice number.
///
/// ## Rules
/// - Must not be blank
/// - At most 50 characters after trimming
/// - Letters, digits, `-`, `_` and `/` only
///
/// ```rust
/// use waybill_core::validation::validate_invoice_number;
///
/// assert!(validate_invoice_number("KS-1001/24").is_ok());
/// assert!(validate_invoice_number("").is_err());
/// assert!(validate_invoice_number("KS 1001").is_err());
/// ```
pub fn validate_invoice_number(invoice_number: &str) -> ValidationResult<()> {
    let value = invoice_number.trim();
    validate_required("invoice_number", value)?;

    if value.chars().count() > MAX_INVOICE_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "invoice_number".to_string(),
            max: MAX_INVOICE_NUMBER_LEN,
        });
    }

    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '/')))
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: format!("character '{bad}' is not allowed"),
        });
    }

    Ok(())
}

/// Validates the display name of a master-data record.
pub fn validate_master_name(name: &str) -> ValidationResult<()> {
    validate_required("name", name)?;
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

pub fn validate_master_record(record: &MasterRecord) -> ValidationResult<()> {
    validate_master_name(&record.name)
}

// =============================================================================
// Shipment Validators
// =============================================================================

/// Checks the header fields a shipment cannot exist without.
pub fn validate_header(header: &ShipmentHeader) -> ValidationResult<()> {
    validate_invoice_number(&header.invoice_number)?;
    validate_required("shipper", &header.shipper)?;
    validate_required("consignee", &header.consignee)?;
    Ok(())
}

fn non_negative(field: String, negative: bool) -> ValidationResult<()> {
    if negative {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

/// Boxes may be empty; dimensions and product numbers may not be negative.
pub fn validate_box(position: usize, shipment_box: &ShipmentBox) -> ValidationResult<()> {
    let label = |f: &str| format!("boxes[{position}].{f}");
    for (name, value) in [
        ("length", shipment_box.length),
        ("width", shipment_box.width),
        ("height", shipment_box.height),
    ] {
        if !value.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: label(name),
                reason: "not a number".to_string(),
            });
        }
        non_negative(label(name), value < 0.0)?;
    }

    for (idx, product) in shipment_box.products.iter().enumerate() {
        validate_product(&label(&format!("products[{idx}]")), product)?;
    }
    Ok(())
}

pub fn validate_product(prefix: &str, product: &ShipmentProduct) -> ValidationResult<()> {
    non_negative(format!("{prefix}.weight"), product.weight.is_negative())?;
    non_negative(format!("{prefix}.rate"), product.rate.is_negative())?;
    non_negative(format!("{prefix}.approx_quantity"), product.approx_quantity < 0)?;
    Ok(())
}

pub fn validate_boxes(boxes: &[ShipmentBox]) -> ValidationResult<()> {
    boxes
        .iter()
        .enumerate()
        .try_for_each(|(idx, b)| validate_box(idx, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::weight::Weight;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_invoice_number("ks1001"), "KS1001");
        assert_eq!(normalize_invoice_number("  KS1001\t"), "KS1001");
        assert_eq!(normalize_name("  Andes   FLOWERS "), "andes flowers");
    }

    #[test]
    fn test_invoice_number_rules() {
        assert!(validate_invoice_number("KS1001").is_ok());
        assert!(matches!(
            validate_invoice_number("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_invoice_number(&"A".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
        assert!(matches!(
            validate_invoice_number("KS#1"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_header_requires_shipper_and_consignee() {
        let header = ShipmentHeader::new("KS1001", "Andes Flowers", "");
        let err = validate_header(&header).unwrap_err();
        assert_eq!(err.to_string(), "consignee is required");

        let header = ShipmentHeader::new("KS1001", "Andes Flowers", "Dutch Auction BV");
        assert!(validate_header(&header).is_ok());
    }

    #[test]
    fn test_negative_product_rejected() {
        let mut shipment_box = ShipmentBox::new();
        shipment_box.products.push(ShipmentProduct::new(
            "Roses",
            Weight::from_grams(-1),
            Money::from_cents(100),
        ));
        let err = validate_boxes(&[shipment_box]).unwrap_err();
        assert_eq!(err.to_string(), "boxes[0].products[0].weight must not be negative");
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let shipment_box = ShipmentBox::with_dimensions(40.0, -1.0, 30.0);
        assert!(matches!(
            validate_box(0, &shipment_box),
            Err(ValidationError::Negative { .. })
        ));
    }
}
