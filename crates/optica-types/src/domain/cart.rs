use serde::{Deserialize, Serialize};

use super::order::{CustomerInfo, ProductId};

/// Quantity exactly as the buyer submitted it. Kept loose so a bad value is
/// reported against its product rather than as a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestedQuantity {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl RequestedQuantity {
    /// The quantity as a positive count, if it is one.
    pub fn positive(&self) -> Option<u32> {
        let qty = match self {
            RequestedQuantity::Number(n) => u32::try_from(*n).ok(),
            RequestedQuantity::Text(s) => s.trim().parse::<u32>().ok(),
            RequestedQuantity::Other(_) => None,
        };
        qty.filter(|q| *q > 0)
    }
}

impl Default for RequestedQuantity {
    fn default() -> Self {
        RequestedQuantity::Other(serde_json::Value::Null)
    }
}

impl From<u32> for RequestedQuantity {
    fn from(q: u32) -> Self {
        RequestedQuantity::Number(i64::from(q))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad", default)]
    pub quantity: RequestedQuantity,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: impl Into<RequestedQuantity>) -> Self {
        Self {
            product_id,
            quantity: quantity.into(),
        }
    }
}

/// Checkout submission. Prices are never read from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    #[serde(alias = "cliente")]
    pub customer: CustomerInfo,
    #[serde(rename = "productos", default)]
    pub items: Vec<CartItem>,
}
