use std::collections::HashMap;
use std::sync::Arc;

use optica_types::domain::cart::Cart;
use optica_types::domain::order::{NewLineItem, NewOrder, Owner, ProductId};
use optica_types::domain::product::Product;
use optica_types::ports::catalog::ProductCatalog;

use crate::errors::AppError;

/// Turns a cart into a priced [`NewOrder`] using catalog prices only.
pub struct PricingEngine {
    catalog: Arc<dyn ProductCatalog>,
}

impl PricingEngine {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    /// Checks, in order: the cart is non-empty, every product exists, every
    /// quantity is a positive integer. Nothing is written here.
    pub async fn price(&self, cart: Cart, owner: Owner) -> Result<NewOrder, AppError> {
        if cart.items.is_empty() {
            return Err(AppError::bad_request(
                "order must contain at least one product",
            ));
        }

        let mut ids: Vec<ProductId> = cart.items.iter().map(|it| it.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let products: HashMap<ProductId, Product> = self
            .catalog
            .find_products_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|p| ids.binary_search(&p.id).is_ok())
            .map(|p| (p.id, p))
            .collect();
        if products.len() < ids.len() {
            return Err(missing_products());
        }

        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = products.get(&item.product_id).ok_or_else(missing_products)?;
            let quantity = item.quantity.positive().ok_or_else(|| {
                AppError::bad_request(format!("invalid quantity for product {}", product.name))
            })?;
            lines.push(NewLineItem {
                product_id: product.id,
                quantity,
                unit_price: product.current_price,
            });
        }

        NewOrder::new(cart.customer, owner, lines)
            .ok_or_else(|| AppError::bad_request("order total exceeds the supported amount"))
    }
}

fn missing_products() -> AppError {
    AppError::bad_request("one or more products do not exist")
}
