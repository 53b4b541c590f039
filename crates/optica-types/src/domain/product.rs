use serde::{Deserialize, Serialize};

use super::order::{Amount, ProductId};

/// Catalog view consumed by checkout: identity, display name and the price
/// charged right now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub current_price: Amount,
}
