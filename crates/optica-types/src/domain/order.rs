use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::product::Product;

/// Money in whole currency units. The storefront has no sub-unit prices.
pub type Amount = i64;

pub type OrderId = i64;
pub type ProductId = i64;
pub type AccountId = i64;

/// Current time at the precision the repositories persist.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "pagada")]
    Paid,
    #[serde(rename = "preparando")]
    Preparing,
    #[serde(rename = "enviada")]
    Shipped,
    #[serde(rename = "entregada")]
    Delivered,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendiente",
            OrderStatus::Paid => "pagada",
            OrderStatus::Preparing => "preparando",
            OrderStatus::Shipped => "enviada",
            OrderStatus::Delivered => "entregada",
            OrderStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status")]
pub struct UnknownStatus;

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(UnknownStatus)
    }
}

/// Who placed the order. An authenticated account and a guest session are
/// mutually exclusive; an order may also carry neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum Owner {
    Account {
        #[serde(rename = "cuentaId")]
        account_id: AccountId,
    },
    Anonymous {
        #[serde(rename = "sesion")]
        session_id: String,
    },
    #[default]
    Unowned,
}

impl Owner {
    /// Picks the owner for a checkout. An account always wins over a guest
    /// token; blank tokens are ignored.
    pub fn resolve(account_id: Option<AccountId>, anonymous_token: Option<&str>) -> Self {
        match (account_id, anonymous_token.map(str::trim)) {
            (Some(account_id), _) => Owner::Account { account_id },
            (None, Some(token)) if !token.is_empty() => Owner::Anonymous {
                session_id: token.to_string(),
            },
            _ => Owner::Unowned,
        }
    }

    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Owner::Account { account_id } => Some(*account_id),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Owner::Anonymous { session_id } => Some(session_id),
            _ => None,
        }
    }

    /// Rebuilds the variant from the two nullable storage columns.
    pub fn from_columns(account_id: Option<AccountId>, session_id: Option<String>) -> Self {
        match (account_id, session_id) {
            (Some(account_id), _) => Owner::Account { account_id },
            (None, Some(session_id)) => Owner::Anonymous { session_id },
            (None, None) => Owner::Unowned,
        }
    }
}

/// Customer contact details, copied onto the order at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfo {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "direccion")]
    pub address: String,
    #[serde(
        rename = "observaciones",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub observations: Option<String>,
}

/// A line already priced from the catalog but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Amount,
}

/// A priced order waiting for its first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer: CustomerInfo,
    pub owner: Owner,
    pub status: OrderStatus,
    pub total: Amount,
    pub items: Vec<NewLineItem>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Returns `None` when there are no items or the total overflows.
    pub fn new(customer: CustomerInfo, owner: Owner, items: Vec<NewLineItem>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let total = line_total(items.iter().map(|it| (it.quantity, it.unit_price)))?;
        Some(Self {
            customer,
            owner,
            status: OrderStatus::Pending,
            total,
            items,
            created_at: now(),
        })
    }
}

/// Sum of `quantity * unit_price`, or `None` on overflow.
pub fn line_total(lines: impl IntoIterator<Item = (u32, Amount)>) -> Option<Amount> {
    lines.into_iter().try_fold(0 as Amount, |acc, (qty, price)| {
        Amount::from(qty)
            .checked_mul(price)
            .and_then(|sub| acc.checked_add(sub))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: i64,
    #[serde(rename = "productoId")]
    pub product_id: Option<ProductId>,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precio")]
    pub unit_price: Amount,
    /// Current catalog data for display. Absent once the product is gone.
    #[serde(rename = "producto", default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(flatten)]
    pub customer: CustomerInfo,
    pub status: OrderStatus,
    pub total: Amount,
    #[serde(rename = "propietario")]
    pub owner: Owner,
    #[serde(rename = "productos")]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialises a freshly inserted order from its pending form.
    pub fn from_new(id: OrderId, new: NewOrder, item_ids: impl IntoIterator<Item = i64>) -> Self {
        let items = new
            .items
            .into_iter()
            .zip(item_ids)
            .map(|(it, id)| OrderLineItem {
                id,
                product_id: Some(it.product_id),
                quantity: it.quantity,
                unit_price: it.unit_price,
                product: None,
            })
            .collect();
        Self {
            id,
            customer: new.customer,
            status: new.status,
            total: new.total,
            owner: new.owner,
            items,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Total recomputed from the stored snapshots.
    pub fn items_total(&self) -> Option<Amount> {
        line_total(self.items.iter().map(|it| (it.quantity, it.unit_price)))
    }

    /// Sets the status and advances `updated_at`, strictly, even when the
    /// clock has not moved since the last write.
    pub fn set_status(&mut self, status: OrderStatus) {
        let now = now();
        self.status = status;
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}
