use async_trait::async_trait;

use crate::domain::order::ProductId;
use crate::domain::product::Product;
use crate::ports::RepoError;

/// Read side of the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync + 'static {
    /// Resolves every id that exists in one round trip. Missing ids are
    /// simply absent from the result.
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepoError>;
}
