//! # Weight Module
//!
//! Product weights are kept in whole grams. Invoices quote weights in
//! kilograms with up to three decimals, so a gram is the smallest unit
//! that never loses precision on input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::parse_scaled;

/// A weight in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams)
    }

    /// Converts a kilogram value, rounding to the nearest gram.
    pub fn from_kg(kg: f64) -> Self {
        if kg.is_finite() {
            Weight((kg * 1000.0).round() as i64)
        } else {
            Weight(0)
        }
    }

    #[inline]
    pub const fn grams(&self) -> i64 {
        self.0
    }

    /// Kilograms, for display and interchange only.
    #[inline]
    pub fn kg(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl FromStr for Weight {
    type Err = ValidationError;

    /// Parses a kilogram string such as `"25.5"` into grams.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, 3)
            .map(Weight)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "weight".to_string(),
                reason: format!("'{s}' is not a weight in kg"),
            })
    }
}

/// Renders as kilograms with trailing zeros trimmed: `25.5 kg`, `20 kg`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / 1000).abs();
        let frac = (self.0 % 1000).abs();
        if frac == 0 {
            write!(f, "{sign}{whole} kg")
        } else {
            let digits = format!("{frac:03}");
            write!(f, "{sign}{whole}.{} kg", digits.trim_end_matches('0'))
        }
    }
}

impl Add for Weight {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Weight(self.0 + other.0)
    }
}

impl AddAssign for Weight {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Weight>>(iter: I) -> Self {
        iter.fold(Weight::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kg_rounds_to_gram() {
        assert_eq!(Weight::from_kg(25.5).grams(), 25500);
        assert_eq!(Weight::from_kg(0.0004).grams(), 0);
        assert_eq!(Weight::from_kg(1.2346).grams(), 1235);
        assert_eq!(Weight::from_kg(f64::NAN).grams(), 0);
    }

    #[test]
    fn test_parse_and_display() {
        let w: Weight = "25.5".parse().unwrap();
        assert_eq!(w.grams(), 25500);
        assert_eq!(w.to_string(), "25.5 kg");
        assert_eq!(Weight::from_grams(20000).to_string(), "20 kg");
        assert_eq!(Weight::from_grams(1234).to_string(), "1.234 kg");
        assert!("heavy".parse::<Weight>().is_err());
    }

    #[test]
    fn test_sum() {
        let total: Weight = [Weight::from_grams(25500), Weight::from_grams(20000)]
            .into_iter()
            .sum();
        assert_eq!(total.grams(), 45500);
    }
}
