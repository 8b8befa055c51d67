//! # Money Module
//!
//! Provides the `Money` type for invoice amounts and the `TaxRate` type
//! used by the totals calculator.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    25.5 kg × 15.00 + 20 kg × 12.50 as f64 can drift by 1e-13           │
//! │    and print as 632.4999999999999                                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    rates are cents per kg, weights are grams                           │
//! │    Σ grams × cents is exact; we round to cents exactly once            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use waybill_core::money::Money;
//!
//! let rate: Money = "15.00".parse().unwrap();
//! assert_eq!(rate.cents(), 1500);
//! assert_eq!(rate.to_string(), "15.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed so that discounts and corrections can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use waybill_core::money::Money;
    ///
    /// let rate = Money::from_cents(1250); // 12.50 per kg
    /// assert_eq!(rate.cents(), 1250);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Cents portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax with half-up rounding on integer cents.
    ///
    /// ## Implementation
    /// `(amount * bps + 5000) / 10000`, computed in i128.
    ///
    /// ```rust
    /// use waybill_core::money::{Money, TaxRate};
    ///
    /// let subtotal = Money::from_cents(63250); // 632.50
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.cents(), 6325);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Amount as a floating point number, for display and interchange only.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses a plain decimal string into an integer scaled by `10^scale`.
///
/// Extra fractional digits are rounded half-up. Exponent notation is
/// accepted through an `f64` fallback since JSON serializers emit it for
/// very large or very small numbers.
pub(crate) fn parse_scaled(input: &str, scale: u32) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if s.contains(['e', 'E']) {
        let value: f64 = s.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        return Some((value * 10f64.powi(scale as i32)).round() as i64);
    }

    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let factor = 10i64.checked_pow(scale)?;
    let int_value: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut scaled = int_value.checked_mul(factor)?;

    let digits: Vec<u32> = frac_part.chars().filter_map(|c| c.to_digit(10)).collect();
    let mut place = factor / 10;
    for (idx, digit) in digits.iter().enumerate() {
        if idx as u32 >= scale {
            if *digit >= 5 {
                scaled = scaled.checked_add(1)?;
            }
            break;
        }
        scaled = scaled.checked_add(*digit as i64 * place)?;
        place /= 10;
    }

    Some(if negative { -scaled } else { scaled })
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses `"15"`, `"15.5"`, `"15.00"` or `"-3.25"` exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, 2)
            .map(Money::from_cents)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: format!("'{s}' is not a decimal number"),
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain two-decimal rendering; currency symbols are a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the default invoice tax of 10% is 1000 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}
