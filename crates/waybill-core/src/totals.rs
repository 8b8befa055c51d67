//! # Totals Calculator
//!
//! Derives the financial summary of an invoice from its boxes. Totals are
//! never persisted; callers recompute them from current box data whenever
//! they need them.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for every product in every box:                                        │
//! │      line = weight_grams × rate_cents        (exact, gram·cents)        │
//! │                                                                         │
//! │  subtotal = round_half_up(Σ line / 1000)     (cents, rounded once)      │
//! │  tax      = subtotal × policy.tax_rate       (default 10%)              │
//! │  discount = policy.discount                  (default 0)                │
//! │  total    = subtotal + tax − discount                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use waybill_core::money::Money;
//! use waybill_core::totals::compute_totals;
//! use waybill_core::types::{ShipmentBox, ShipmentProduct};
//! use waybill_core::weight::Weight;
//!
//! let mut shipment_box = ShipmentBox::new();
//! shipment_box.products.push(ShipmentProduct::new("Roses", Weight::from_grams(25_500), Money::from_cents(1500)));
//! shipment_box.products.push(ShipmentProduct::new("Carnations", Weight::from_grams(20_000), Money::from_cents(1250)));
//!
//! let totals = compute_totals(&[shipment_box]);
//! assert_eq!(totals.subtotal.cents(), 63_250);
//! assert_eq!(totals.tax.cents(), 6_325);
//! assert_eq!(totals.total.cents(), 69_575);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, TaxRate};
use crate::types::ShipmentBox;
use crate::weight::Weight;

/// Default invoice tax: 10%.
pub const DEFAULT_TAX_RATE: TaxRate = TaxRate::from_bps(1000);

/// Tax and discount applied on top of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TotalsPolicy {
    pub tax_rate: TaxRate,
    pub discount: Money,
}

impl Default for TotalsPolicy {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            discount: Money::zero(),
        }
    }
}

/// Derived invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub total_weight: Weight,
    pub total_items: u64,
}

/// Computes totals with the default policy.
pub fn compute_totals(boxes: &[ShipmentBox]) -> Totals {
    compute_totals_with(boxes, &TotalsPolicy::default())
}

/// Computes totals under an explicit tax/discount policy.
pub fn compute_totals_with(boxes: &[ShipmentBox], policy: &TotalsPolicy) -> Totals {
    let mut gram_cents: i128 = 0;
    let mut total_weight = Weight::zero();
    let mut total_items = 0u64;

    for product in boxes.iter().flat_map(|b| b.products.iter()) {
        gram_cents += product.weight.grams() as i128 * product.rate.cents() as i128;
        total_weight += product.weight;
        total_items += 1;
    }

    let subtotal = Money::from_cents(round_div(gram_cents, 1000) as i64);
    let tax = subtotal.calculate_tax(policy.tax_rate);
    let discount = policy.discount;

    Totals {
        subtotal,
        tax,
        discount,
        total: subtotal + tax - discount,
        total_weight,
        total_items,
    }
}

/// Integer division rounding half away from zero.
fn round_div(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}
