//! The numeric bridge between pipeline data and the record store.
//!
//! The record store rejects native floating-point values; its only numeric
//! type is an exact decimal. [`normalize`] rewrites an arbitrary
//! [`Document`] tree into a [`StoreValue`] tree under one uniform policy:
//!
//! - finite floats convert through their canonical decimal string (the
//!   shortest round-trip form), never through direct binary conversion,
//!   so `0.1` is stored as exactly `0.1` and not a binary artifact;
//! - integers convert losslessly to the same decimal type;
//! - NaN, +Infinity and -Infinity cannot exist as decimals and are
//!   substituted with the reserved string sentinels `"NaN"`,
//!   `"Infinity"` and `"-Infinity"`. Consumers must treat these three
//!   strings as reserved.
//!
//! The transform is a pure function with no knowledge of any store client.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Reserved sentinel stored in place of a NaN.
pub const NAN_SENTINEL: &str = "NaN";
/// Reserved sentinel stored in place of +Infinity.
pub const INFINITY_SENTINEL: &str = "Infinity";
/// Reserved sentinel stored in place of -Infinity.
pub const NEG_INFINITY_SENTINEL: &str = "-Infinity";

/// Input tree: what pipeline data looks like before normalization.
/// Floats may be non-finite.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    List(Vec<Document>),
    Map(BTreeMap<String, Document>),
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::String(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Document::String(s)
    }
}

impl From<u64> for Document {
    fn from(v: u64) -> Self {
        Document::UInt(v)
    }
}

impl From<u32> for Document {
    fn from(v: u32) -> Self {
        Document::UInt(v as u64)
    }
}

impl From<f64> for Document {
    fn from(v: f64) -> Self {
        Document::Float(v)
    }
}

/// Storage tree: no float variant exists, by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Null,
    Bool(bool),
    Number(Decimal),
    String(String),
    List(Vec<StoreValue>),
    Map(BTreeMap<String, StoreValue>),
}

/// A number that has no exact-decimal representation in the store.
#[derive(Debug, Error)]
#[error("number {value} cannot be represented as an exact decimal")]
pub struct NumericError {
    pub value: String,
}

/// Rewrite every numeric leaf of `doc` into the store's exact-decimal
/// representation, applying the sentinel policy to non-finite floats.
pub fn normalize(doc: Document) -> Result<StoreValue, NumericError> {
    match doc {
        Document::Null => Ok(StoreValue::Null),
        Document::Bool(b) => Ok(StoreValue::Bool(b)),
        Document::Int(i) => Ok(StoreValue::Number(Decimal::from(i))),
        Document::UInt(u) => Ok(StoreValue::Number(Decimal::from(u))),
        Document::Float(f) => normalize_float(f),
        Document::String(s) => Ok(StoreValue::String(s)),
        Document::List(items) => items
            .into_iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()
            .map(StoreValue::List),
        Document::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| normalize(v).map(|v| (k, v)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(StoreValue::Map),
    }
}

fn normalize_float(f: f64) -> Result<StoreValue, NumericError> {
    if f.is_nan() {
        return Ok(StoreValue::String(NAN_SENTINEL.to_string()));
    }
    if f.is_infinite() {
        let sentinel = if f > 0.0 {
            INFINITY_SENTINEL
        } else {
            NEG_INFINITY_SENTINEL
        };
        return Ok(StoreValue::String(sentinel.to_string()));
    }

    // Canonical decimal string first; scientific form as a fallback for
    // magnitudes whose plain rendering exceeds the parser.
    let canonical = f.to_string();
    Decimal::from_str(&canonical)
        .or_else(|_| Decimal::from_scientific(&format!("{f:e}")))
        .map(StoreValue::Number)
        .map_err(|_| NumericError { value: canonical })
}

impl StoreValue {
    /// Render for a query response. Whole decimals become JSON integers,
    /// fractional ones become floats, the inverse of the write-side
    /// bridge, minus the sentinels, which stay strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StoreValue::Null => serde_json::Value::Null,
            StoreValue::Bool(b) => serde_json::Value::Bool(*b),
            StoreValue::Number(d) => decimal_to_json(*d),
            StoreValue::String(s) => serde_json::Value::String(s.clone()),
            StoreValue::List(items) => {
                serde_json::Value::Array(items.iter().map(StoreValue::to_json).collect())
            }
            StoreValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn decimal_to_json(d: Decimal) -> serde_json::Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return serde_json::Value::Number(i.into());
        }
    }
    match d.to_f64().and_then(serde_json::Number::from_f64) {
        Some(n) => serde_json::Value::Number(n),
        None => serde_json::Value::String(d.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_finite_float_is_exact() {
        // 0.1 has no exact binary representation; the string-mediated
        // conversion must still store exactly 0.1
        let value = normalize(Document::Float(0.1)).unwrap();
        assert_eq!(value, StoreValue::Number(dec("0.1")));

        let value = normalize(Document::Float(95.5)).unwrap();
        assert_eq!(value, StoreValue::Number(dec("95.5")));
    }

    #[test]
    fn test_normalize_integers_become_decimals() {
        assert_eq!(
            normalize(Document::Int(-42)).unwrap(),
            StoreValue::Number(dec("-42"))
        );
        assert_eq!(
            normalize(Document::UInt(800)).unwrap(),
            StoreValue::Number(dec("800"))
        );
    }

    #[test]
    fn test_normalize_non_finite_sentinels() {
        assert_eq!(
            normalize(Document::Float(f64::NAN)).unwrap(),
            StoreValue::String("NaN".into())
        );
        assert_eq!(
            normalize(Document::Float(f64::INFINITY)).unwrap(),
            StoreValue::String("Infinity".into())
        );
        assert_eq!(
            normalize(Document::Float(f64::NEG_INFINITY)).unwrap(),
            StoreValue::String("-Infinity".into())
        );
    }

    #[test]
    fn test_normalize_recurses_through_nested_structure() {
        let mut label = BTreeMap::new();
        label.insert("name".to_string(), Document::from("Nature"));
        label.insert("confidence".to_string(), Document::Float(95.0));

        let mut map = BTreeMap::new();
        map.insert(
            "labels".to_string(),
            Document::List(vec![Document::Map(label)]),
        );
        map.insert("width_pixels".to_string(), Document::UInt(800));

        let value = normalize(Document::Map(map)).unwrap();
        let StoreValue::Map(entries) = value else {
            panic!("expected map");
        };
        assert_eq!(entries["width_pixels"], StoreValue::Number(dec("800")));
        let StoreValue::List(labels) = &entries["labels"] else {
            panic!("expected list");
        };
        let StoreValue::Map(label) = &labels[0] else {
            panic!("expected map");
        };
        assert_eq!(label["confidence"], StoreValue::Number(dec("95")));
    }

    #[test]
    fn test_normalize_rejects_out_of_range_magnitude() {
        let err = normalize(Document::Float(1e300)).unwrap_err();
        assert!(err.to_string().contains("exact decimal"));
    }

    #[test]
    fn test_to_json_whole_and_fractional() {
        assert_eq!(StoreValue::Number(dec("800")).to_json(), serde_json::json!(800));
        assert_eq!(StoreValue::Number(dec("95.5")).to_json(), serde_json::json!(95.5));
    }

    #[test]
    fn test_to_json_preserves_sentinel_strings() {
        assert_eq!(
            StoreValue::String("NaN".into()).to_json(),
            serde_json::json!("NaN")
        );
    }

    #[test]
    fn test_store_value_file_roundtrip() {
        // The file-backed store serializes items as JSON; decimals must
        // survive unchanged
        let value = StoreValue::Number(dec("0.1"));
        let json = serde_json::to_string(&value).unwrap();
        let parsed: StoreValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }
}
