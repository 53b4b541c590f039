use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use optica_types::domain::account::Account;
use optica_types::domain::order::{
    AccountId, Amount, NewOrder, Order, OrderId, OrderStatus, ProductId,
};
use optica_types::domain::product::Product;
use optica_types::domain::query::OrderQuery;
use optica_types::ports::accounts::AccountDirectory;
use optica_types::ports::catalog::ProductCatalog;
use optica_types::ports::order_repository::{OrderRepository, RepoError};

#[derive(Default)]
struct Sequences {
    orders: AtomicI64,
    items: AtomicI64,
    products: AtomicI64,
    accounts: AtomicI64,
}

fn next(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::Relaxed) + 1
}

/// Orders hold their line items inline, so creating or removing an entry
/// is a single map operation.
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    pub orders: Arc<DashMap<OrderId, Order>>,
    pub products: Arc<DashMap<ProductId, Product>>,
    pub accounts: Arc<DashMap<AccountId, Account>>,
    ids: Arc<Sequences>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, name: &str, price: Amount) -> Product {
        let product = Product {
            id: next(&self.ids.products),
            name: name.to_string(),
            current_price: price,
        };
        self.products.insert(product.id, product.clone());
        product
    }

    pub fn set_product_price(&self, id: ProductId, price: Amount) -> bool {
        match self.products.get_mut(&id) {
            Some(mut p) => {
                p.current_price = price;
                true
            }
            None => false,
        }
    }

    /// Line items keep their snapshot and lose the product reference.
    pub fn delete_product(&self, id: ProductId) -> bool {
        if self.products.remove(&id).is_none() {
            return false;
        }
        for mut order in self.orders.iter_mut() {
            for item in order.items.iter_mut() {
                if item.product_id == Some(id) {
                    item.product_id = None;
                }
            }
        }
        true
    }

    pub fn insert_account(&self, email: &str) -> Account {
        let account = Account {
            id: next(&self.ids.accounts),
            email: email.to_string(),
        };
        self.accounts.insert(account.id, account.clone());
        account
    }

    pub fn count_line_items(&self, order_id: Option<OrderId>) -> usize {
        self.orders
            .iter()
            .filter(|o| order_id.map_or(true, |id| o.id == id))
            .map(|o| o.items.len())
            .sum()
    }

    /// Joins current catalog data onto a stored copy.
    fn hydrate(&self, mut order: Order) -> Order {
        for item in order.items.iter_mut() {
            item.product = item
                .product_id
                .and_then(|id| self.products.get(&id).map(|p| p.clone()));
        }
        order
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        let id = next(&self.ids.orders);
        let item_ids: Vec<i64> = order.items.iter().map(|_| next(&self.ids.items)).collect();
        let order = Order::from_new(id, order, item_ids);
        self.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        let stored = self.orders.get(&id).map(|r| r.clone());
        Ok(stored.map(|o| self.hydrate(o)))
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepoError> {
        let mut found: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| query.matches(kv.value()))
            .map(|kv| kv.value().clone())
            .collect();
        query.sort(&mut found);
        Ok(found.into_iter().map(|o| self.hydrate(o)).collect())
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepoError> {
        let updated = match self.orders.get_mut(&id) {
            Some(mut v) => {
                v.status = status;
                v.updated_at = updated_at;
                v.clone()
            }
            None => return Ok(None),
        };
        Ok(Some(self.hydrate(updated)))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepoError> {
        Ok(self.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryRepo {
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepoError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.products.get(id).map(|p| p.clone()))
            .collect())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryRepo {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.value().clone()))
    }
}
