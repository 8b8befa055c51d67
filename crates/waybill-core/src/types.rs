//! # Domain Types
//!
//! Core domain types for Waybill.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   owns   ┌─────────────────┐  owns  ┌───────────┐ │
//! │  │    Shipment     │─────────►│   ShipmentBox   │───────►│ Shipment- │ │
//! │  │  ─────────────  │  1..N    │  ─────────────  │  0..N  │  Product  │ │
//! │  │  invoice_number │          │  box_number     │        │  weight   │ │
//! │  │  shipper ───────┼──┐       │  l × w × h      │        │  rate     │ │
//! │  │  consignee ─────┼──┤       └─────────────────┘        └─────┬─────┘ │
//! │  └─────────────────┘  │ by name                                │       │
//! │                       ▼                             by name    ▼       │
//! │               ┌──────────────────────────────────────────────────────┐ │
//! │               │ MasterRecord (Shipper, Consignee, ProductType,       │ │
//! │               │               FlowerType)                            │ │
//! │               └──────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4, immutable, used for local relations
//! - natural key: `invoice_number` for shipments, case-folded `name` for
//!   master data; the only identity both stores agree on

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use ts_rs::TS;

use crate::lenient;
use crate::money::Money;
use crate::validation::{normalize_invoice_number, normalize_name};
use crate::weight::Weight;

// =============================================================================
// Shipment Status
// =============================================================================

/// Lifecycle status of a published shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ShipmentStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(ShipmentStatus::Pending),
            "in_transit" | "intransit" => Ok(ShipmentStatus::InTransit),
            "delivered" => Ok(ShipmentStatus::Delivered),
            "cancelled" | "canceled" => Ok(ShipmentStatus::Cancelled),
            other => Err(format!("unknown shipment status: {other}")),
        }
    }
}

// =============================================================================
// Master Data
// =============================================================================

/// The four shared reference classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum MasterDataKind {
    Shipper,
    Consignee,
    ProductType,
    FlowerType,
}

impl MasterDataKind {
    pub const ALL: [MasterDataKind; 4] = [
        MasterDataKind::Shipper,
        MasterDataKind::Consignee,
        MasterDataKind::ProductType,
        MasterDataKind::FlowerType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasterDataKind::Shipper => "shipper",
            MasterDataKind::Consignee => "consignee",
            MasterDataKind::ProductType => "product_type",
            MasterDataKind::FlowerType => "flower_type",
        }
    }

    /// The sync class carrying records of this kind.
    pub fn entity_class(&self) -> EntityClass {
        match self {
            MasterDataKind::Shipper => EntityClass::Shippers,
            MasterDataKind::Consignee => EntityClass::Consignees,
            MasterDataKind::ProductType => EntityClass::ProductTypes,
            MasterDataKind::FlowerType => EntityClass::FlowerTypes,
        }
    }
}

impl fmt::Display for MasterDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasterDataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "shipper" | "shippers" => Ok(MasterDataKind::Shipper),
            "consignee" | "consignees" => Ok(MasterDataKind::Consignee),
            "product_type" | "product_types" => Ok(MasterDataKind::ProductType),
            "flower_type" | "flower_types" => Ok(MasterDataKind::FlowerType),
            other => Err(format!("unknown master data kind: {other}")),
        }
    }
}

/// A shipper, consignee, product type or flower type.
///
/// Shipments and products reference these by name, never by id, so a
/// record can be renamed without touching published invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MasterRecord {
    #[serde(default)]
    pub id: String,
    pub kind: MasterDataKind,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MasterRecord {
    /// Creates a record with a fresh id and timestamps.
    pub fn new(kind: MasterDataKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            name: name.into().trim().to_string(),
            address: None,
            contact: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Natural key: trimmed, case-folded name.
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Whether a master-data write created a record or changed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// Event fanned out to open edit sessions when reference data changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MasterDataChange {
    pub kind: MasterDataKind,
    pub action: ChangeAction,
    pub record: MasterRecord,
}

// =============================================================================
// Shipment Header
// =============================================================================

/// Header fields of an invoice.
///
/// Shared by the persisted `Shipment` and the draft form snapshot. In a
/// draft, the three required fields may still be blank; they are checked
/// when the draft is published. Every field accepts its camelCase spelling
/// on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentHeader {
    #[serde(default, alias = "invoiceNumber", deserialize_with = "lenient::string")]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub shipper: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub consignee: String,
    #[serde(default, alias = "invoiceTitle", deserialize_with = "lenient::opt_string")]
    pub invoice_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub awb: Option<String>,
    #[serde(default, alias = "masterAwb", deserialize_with = "lenient::opt_string")]
    pub master_awb: Option<String>,
    #[serde(default, alias = "houseAwb", deserialize_with = "lenient::opt_string")]
    pub house_awb: Option<String>,
    #[serde(default, alias = "flightNo", deserialize_with = "lenient::opt_string")]
    pub flight_no: Option<String>,
    #[serde(default, alias = "flightDate", deserialize_with = "lenient::opt_date")]
    #[ts(as = "Option<String>")]
    pub flight_date: Option<NaiveDate>,
    #[serde(default, alias = "dischargeAirport", deserialize_with = "lenient::opt_string")]
    pub discharge_airport: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    #[ts(as = "Option<String>")]
    pub eta: Option<NaiveDate>,
    #[serde(default, alias = "invoiceDate", deserialize_with = "lenient::opt_date")]
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, alias = "dateOfIssue", deserialize_with = "lenient::opt_date")]
    #[ts(as = "Option<String>")]
    pub date_of_issue: Option<NaiveDate>,
    #[serde(default, alias = "placeOfReceipt", deserialize_with = "lenient::opt_string")]
    pub place_of_receipt: Option<String>,
    #[serde(default, alias = "clientRef", deserialize_with = "lenient::opt_string")]
    pub client_ref: Option<String>,
    #[serde(default, alias = "freightTerms", deserialize_with = "lenient::opt_string")]
    pub freight_terms: Option<String>,
    /// Declared gross weight, in kg on the wire.
    #[serde(default, alias = "grossWeight", with = "lenient::opt_kg")]
    #[ts(type = "number | null")]
    pub gross_weight: Option<Weight>,
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: ShipmentStatus,
}

impl ShipmentHeader {
    /// Header with the three required fields set.
    pub fn new(
        invoice_number: impl Into<String>,
        shipper: impl Into<String>,
        consignee: impl Into<String>,
    ) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            shipper: shipper.into(),
            consignee: consignee.into(),
            ..Default::default()
        }
    }

    /// Natural key of the shipment this header describes.
    pub fn invoice_key(&self) -> String {
        normalize_invoice_number(&self.invoice_number)
    }
}

// =============================================================================
// Boxes & Products
// =============================================================================

/// One product line inside a box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentProduct {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    /// Product type name (references a `ProductType` by name).
    #[serde(default, rename = "type", alias = "product_type", alias = "productType", deserialize_with = "lenient::string")]
    pub product_type: String,
    #[serde(default, alias = "flowerType", deserialize_with = "lenient::opt_string")]
    pub flower_type: Option<String>,
    #[serde(default, alias = "hasStems", deserialize_with = "lenient::flag")]
    pub has_stems: bool,
    /// Net weight, in kg on the wire.
    #[serde(default, with = "lenient::kg")]
    #[ts(type = "number")]
    pub weight: Weight,
    /// Price per kilogram, as a decimal on the wire.
    #[serde(default, with = "lenient::decimal")]
    #[ts(type = "number")]
    pub rate: Money,
    #[serde(default, alias = "approxQuantity", deserialize_with = "lenient::int_or_zero")]
    pub approx_quantity: i64,
}

impl ShipmentProduct {
    pub fn new(product_type: impl Into<String>, weight: Weight, rate: Money) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            product_type: product_type.into(),
            weight,
            rate,
            ..Default::default()
        }
    }
}

/// A physical box on the invoice.
///
/// `box_number` is derived from the box's position and rewritten on every
/// structural change; see [`crate::boxes::renumber`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentBox {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, alias = "boxNumber", deserialize_with = "lenient::u32_or_zero")]
    pub box_number: u32,
    #[serde(default, deserialize_with = "lenient::float_or_zero")]
    pub length: f64,
    #[serde(default, deserialize_with = "lenient::float_or_zero")]
    pub width: f64,
    #[serde(default, deserialize_with = "lenient::float_or_zero")]
    pub height: f64,
    #[serde(default)]
    pub products: Vec<ShipmentProduct>,
}

impl ShipmentBox {
    /// An empty box with a fresh id. Its number is assigned on renumbering.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        }
    }

    pub fn with_dimensions(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
            ..Self::new()
        }
    }
}

// =============================================================================
// Shipment
// =============================================================================

/// A published shipment invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shipment {
    pub id: String,
    #[serde(flatten)]
    pub header: ShipmentHeader,
    #[serde(default)]
    pub boxes: Vec<ShipmentBox>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn invoice_number(&self) -> &str {
        &self.header.invoice_number
    }

    pub fn product_count(&self) -> usize {
        self.boxes.iter().map(|b| b.products.len()).sum()
    }
}

// =============================================================================
// Sync Classes
// =============================================================================

/// The five entity classes the sync engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Shippers,
    Consignees,
    ProductTypes,
    FlowerTypes,
    Shipments,
}

impl EntityClass {
    /// Upload order: reference data before the shipments that name it.
    pub const SYNC_ORDER: [EntityClass; 5] = [
        EntityClass::Shippers,
        EntityClass::Consignees,
        EntityClass::ProductTypes,
        EntityClass::FlowerTypes,
        EntityClass::Shipments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Shippers => "shippers",
            EntityClass::Consignees => "consignees",
            EntityClass::ProductTypes => "product_types",
            EntityClass::FlowerTypes => "flower_types",
            EntityClass::Shipments => "shipments",
        }
    }

    /// `None` for shipments.
    pub fn master_kind(&self) -> Option<MasterDataKind> {
        match self {
            EntityClass::Shippers => Some(MasterDataKind::Shipper),
            EntityClass::Consignees => Some(MasterDataKind::Consignee),
            EntityClass::ProductTypes => Some(MasterDataKind::ProductType),
            EntityClass::FlowerTypes => Some(MasterDataKind::FlowerType),
            EntityClass::Shipments => None,
        }
    }

    /// Name of the natural-key column on the remote side.
    pub fn natural_key_field(&self) -> &'static str {
        match self {
            EntityClass::Shipments => "invoice_number",
            _ => "name_key",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counter per entity class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntityCounts {
    pub shippers: u64,
    pub consignees: u64,
    pub product_types: u64,
    pub flower_types: u64,
    pub shipments: u64,
}

impl EntityCounts {
    pub fn get(&self, class: EntityClass) -> u64 {
        self[class]
    }

    pub fn set(&mut self, class: EntityClass, value: u64) {
        self[class] = value;
    }

    pub fn add(&mut self, class: EntityClass, value: u64) {
        self[class] += value;
    }

    pub fn total(&self) -> u64 {
        EntityClass::SYNC_ORDER.iter().map(|c| self[*c]).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl Index<EntityClass> for EntityCounts {
    type Output = u64;

    fn index(&self, class: EntityClass) -> &u64 {
        match class.ordinal() {
            0 => &self.shippers,
            1 => &self.consignees,
            2 => &self.product_types,
            3 => &self.flower_types,
            _ => &self.shipments,
        }
    }
}

impl IndexMut<EntityClass> for EntityCounts {
    fn index_mut(&mut self, class: EntityClass) -> &mut u64 {
        match class.ordinal() {
            0 => &mut self.shippers,
            1 => &mut self.consignees,
            2 => &mut self.product_types,
            3 => &mut self.flower_types,
            _ => &mut self.shipments,
        }
    }
}

impl fmt::Display for EntityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shippers={} consignees={} product_types={} flower_types={} shipments={}",
            self.shippers, self.consignees, self.product_types, self.flower_types, self.shipments
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_order_is_reference_data_first() {
        assert_eq!(EntityClass::SYNC_ORDER[4], EntityClass::Shipments);
        for class in &EntityClass::SYNC_ORDER[..4] {
            assert!(class.master_kind().is_some());
        }
        for kind in MasterDataKind::ALL {
            assert_eq!(kind.entity_class().master_kind(), Some(kind));
        }
    }

    #[test]
    fn test_entity_counts_indexing() {
        let mut counts = EntityCounts::default();
        assert!(counts.is_zero());
        counts.add(EntityClass::Shipments, 5);
        counts.add(EntityClass::Shippers, 2);
        counts.set(EntityClass::FlowerTypes, 1);
        assert_eq!(counts.shipments, 5);
        assert_eq!(counts.get(EntityClass::Shippers), 2);
        assert_eq!(counts.total(), 8);
    }

    #[test]
    fn test_master_kind_from_str() {
        assert_eq!("Shipper".parse::<MasterDataKind>(), Ok(MasterDataKind::Shipper));
        assert_eq!("flower-types".parse::<MasterDataKind>(), Ok(MasterDataKind::FlowerType));
        assert!("carrier".parse::<MasterDataKind>().is_err());
    }

    #[test]
    fn test_master_name_key() {
        let record = MasterRecord::new(MasterDataKind::Shipper, "  Andes Flowers ");
        assert_eq!(record.name, "Andes Flowers");
        assert_eq!(record.name_key(), "andes flowers");
    }

    #[test]
    fn test_product_accepts_camel_case_and_strings() {
        let product: ShipmentProduct = serde_json::from_str(
            r#"{"type": "Roses", "flowerType": "Freedom", "hasStems": "true",
                "weight": "25.5", "rate": 15, "approxQuantity": "300"}"#,
        )
        .unwrap();
        assert_eq!(product.product_type, "Roses");
        assert_eq!(product.flower_type.as_deref(), Some("Freedom"));
        assert!(product.has_stems);
        assert_eq!(product.weight.grams(), 25500);
        assert_eq!(product.rate.cents(), 1500);
        assert_eq!(product.approx_quantity, 300);
    }

    #[test]
    fn test_header_status_defaults_to_pending() {
        let header: ShipmentHeader =
            serde_json::from_str(r#"{"invoiceNumber": "ks1001", "shipper": "A"}"#).unwrap();
        assert_eq!(header.status, ShipmentStatus::Pending);
        assert_eq!(header.invoice_key(), "KS1001");
        assert_eq!(header.consignee, "");
    }
}
