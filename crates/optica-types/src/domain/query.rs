use chrono::{DateTime, Utc};

use super::order::{Order, OrderStatus, Owner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Inclusive `[from, to]` window over `created_at`. `from <= to` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Validated listing request handed to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderQuery {
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
    pub created: Option<DateRange>,
    pub owner: Option<Owner>,
    pub sort: SortSpec,
}

impl OrderQuery {
    pub fn owned_by(owner: Owner) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.email.as_ref().map_or(true, |e| &order.customer.email == e)
            && self.status.map_or(true, |s| order.status == s)
            && self.created.map_or(true, |r| r.contains(order.created_at))
            && self.owner.as_ref().map_or(true, |o| &order.owner == o)
    }

    /// Orders `orders` in place; ties fall back to id in the same direction.
    pub fn sort(&self, orders: &mut [Order]) {
        orders.sort_by(|a, b| {
            let key = match self.sort.field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            let ord = key.then(a.id.cmp(&b.id));
            match self.sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}
