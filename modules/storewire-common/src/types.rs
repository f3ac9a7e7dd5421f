//! Catalog and receipt types, with parsers for the positional wire shapes
//! the native layer returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Localized product data returned by a successful catalog load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Localized price string, e.g. "$0.99".
    #[serde(default)]
    pub price: String,
}

/// Outcome of a catalog load: the products the store recognized plus the
/// ids it rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedProducts {
    pub products: Vec<Product>,
    pub invalid_ids: Vec<String>,
}

impl LoadedProducts {
    /// Parse the `[validProducts, invalidIds]` response of a catalog load.
    /// `None` when the response is not in that shape.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let parts = value.as_array()?;
        let products =
            serde_json::from_value(parts.first().cloned().unwrap_or(Value::Array(vec![]))).ok()?;
        let invalid_ids =
            serde_json::from_value(parts.get(1).cloned().unwrap_or(Value::Array(vec![]))).ok()?;
        Some(Self {
            products,
            invalid_ids,
        })
    }
}

/// Opaque proof-of-purchase bundle, replaced wholesale on each successful
/// load or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSnapshot {
    /// The receipt itself, base64-encoded.
    pub app_store_receipt: String,
    pub bundle_identifier: String,
    pub bundle_short_version: String,
    pub bundle_numeric_version: i64,
    pub bundle_signature: String,
}

impl ReceiptSnapshot {
    /// Parse the five-element positional payload of a receipt request.
    ///
    /// The receipt itself is required; the bundle fields default when the
    /// native layer omits them.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let args = value.as_array()?;
        Some(Self {
            app_store_receipt: args.first()?.as_str()?.to_string(),
            bundle_identifier: string_at(args, 1),
            bundle_short_version: string_at(args, 2),
            bundle_numeric_version: number_at(args, 3),
            bundle_signature: string_at(args, 4),
        })
    }
}

fn string_at(args: &[Value], idx: usize) -> String {
    args.get(idx)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_at(args: &[Value], idx: usize) -> i64 {
    args.get(idx)
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or_default()
}
