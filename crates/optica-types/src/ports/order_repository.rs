use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::domain::query::OrderQuery;

/// How long a storage call waits for a connection before giving up.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// Storage did not answer in time (pool exhausted, lock timeout).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Writes the order and every line item, or nothing at all.
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError>;
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError>;
    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepoError>;
    /// Persists `status` and `updated_at` only. `None` when the order is gone.
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Order>, RepoError>;
    /// Removes the order together with its line items.
    async fn delete(&self, id: OrderId) -> Result<bool, RepoError>;
}
