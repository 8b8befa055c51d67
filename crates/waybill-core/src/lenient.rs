//! Field-level serde adapters for draft snapshots and mirror payloads.
//!
//! Older snapshots were written by a form layer that stored whatever the
//! input widget held: numbers as strings, blanks as `""`, missing fields as
//! `null`. Everything here deserializes through `serde_json::Value` and
//! falls back to the zero value instead of failing the whole document.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::money::{parse_scaled, Money};
use crate::types::ShipmentStatus;
use crate::weight::Weight;

fn scaled(value: &Value, scale: u32) -> Option<i64> {
    match value {
        Value::Number(n) => parse_scaled(&n.to_string(), scale),
        Value::String(s) => parse_scaled(s, scale),
        Value::Bool(b) => Some(if *b { 10i64.pow(scale) } else { 0 }),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Weight stored as kilograms on the wire.
pub mod kg {
    use super::*;

    pub fn serialize<S: Serializer>(weight: &Weight, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(weight.kg())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weight, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(scaled(&value, 3).map(Weight::from_grams).unwrap_or_default())
    }
}

/// Optional weight stored as kilograms on the wire.
pub mod opt_kg {
    use super::*;

    pub fn serialize<S: Serializer>(weight: &Option<Weight>, serializer: S) -> Result<S::Ok, S::Error> {
        match weight {
            Some(w) => serializer.serialize_f64(w.kg()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Weight>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(scaled(&value, 3).map(Weight::from_grams))
    }
}

/// Money stored as a decimal number (`15.5`) on the wire.
pub mod decimal {
    use super::*;

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.as_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(scaled(&value, 2).map(Money::from_cents).unwrap_or_default())
    }
}

pub fn float_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(float(&value).filter(|f| f.is_finite()).unwrap_or(0.0))
}

pub fn int_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.round() as i64))
            .unwrap_or(0),
        _ => 0,
    })
}

pub fn u32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = int_or_zero(deserializer)?;
    Ok(u32::try_from(n).unwrap_or(0))
}

pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    })
}

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text(value).unwrap_or_default())
}

pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text(value))
}

/// Status by name in any case or spacing (`"In Transit"`, `"in-transit"`);
/// anything unrecognized is `Pending`.
pub fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ShipmentStatus, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text(value)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Accepts `2024-03-01`, a full RFC 3339 timestamp, or blank.
pub fn opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(text(value).and_then(|s| parse_date(&s)))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, with = "kg")]
        weight: Weight,
        #[serde(default, with = "decimal")]
        rate: Money,
        #[serde(default, deserialize_with = "float_or_zero")]
        length: f64,
        #[serde(default, deserialize_with = "int_or_zero")]
        qty: i64,
        #[serde(default, deserialize_with = "flag")]
        stems: bool,
        #[serde(default, deserialize_with = "opt_string")]
        note: Option<String>,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "status")]
        status: ShipmentStatus,
    }

    #[test]
    fn test_numbers_and_strings_are_equivalent() {
        let a: Fields = serde_json::from_str(
            r#"{"weight": 25.5, "rate": 15, "length": 40, "qty": 120, "stems": true}"#,
        )
        .unwrap();
        let b: Fields = serde_json::from_str(
            r#"{"weight": "25.5", "rate": "15.00", "length": "40", "qty": "120", "stems": "true"}"#,
        )
        .unwrap();

        for p in [a, b] {
            assert_eq!(p.weight.grams(), 25500);
            assert_eq!(p.rate.cents(), 1500);
            assert_eq!(p.length, 40.0);
            assert_eq!(p.qty, 120);
            assert!(p.stems);
        }
    }

    #[test]
    fn test_blanks_and_nulls_become_defaults() {
        let p: Fields = serde_json::from_str(
            r#"{"weight": "", "rate": null, "length": "n/a", "qty": "", "note": "  ", "date": ""}"#,
        )
        .unwrap();
        assert_eq!(p.weight, Weight::zero());
        assert_eq!(p.rate, Money::zero());
        assert_eq!(p.length, 0.0);
        assert_eq!(p.qty, 0);
        assert!(!p.stems);
        assert_eq!(p.note, None);
        assert_eq!(p.date, None);
    }

    #[test]
    fn test_status_names_and_fallback() {
        for (json, expected) in [
            (r#"{"status": "Pending"}"#, ShipmentStatus::Pending),
            (r#"{"status": "IN TRANSIT"}"#, ShipmentStatus::InTransit),
            (r#"{"status": "in-transit"}"#, ShipmentStatus::InTransit),
            (r#"{"status": " delivered "}"#, ShipmentStatus::Delivered),
            (r#"{"status": ""}"#, ShipmentStatus::Pending),
            (r#"{"status": null}"#, ShipmentStatus::Pending),
            (r#"{"status": "lost"}"#, ShipmentStatus::Pending),
            (r#"{"status": 3}"#, ShipmentStatus::Pending),
        ] {
            let p: Fields = serde_json::from_str(json).unwrap();
            assert_eq!(p.status, expected, "{json}");
        }
    }

    #[test]
    fn test_dates() {
        assert_eq!(parse_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(
            parse_date("2024-03-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_date("2024-03-01T10:00:00.000"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("yesterday"), None);
    }
}
