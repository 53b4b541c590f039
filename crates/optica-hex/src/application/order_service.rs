use std::collections::HashMap;
use std::sync::Arc;

use optica_types::domain::cart::Cart;
use optica_types::domain::order::{AccountId, Order, OrderId, Owner};
use optica_types::domain::query::OrderQuery;
use optica_types::ports::accounts::AccountDirectory;
use optica_types::ports::catalog::ProductCatalog;
use optica_types::ports::order_repository::OrderRepository;
use tracing::{info, instrument, warn};

use crate::application::order_query::parse_filters;
use crate::application::ownership::OwnershipGuard;
use crate::application::pricing::PricingEngine;
use crate::application::status_machine::{StatusMachine, TransitionPolicy};
use crate::errors::AppError;

pub struct OrderService<R: OrderRepository> {
    repo: R,
    pricing: PricingEngine,
    guard: OwnershipGuard,
    status: StatusMachine,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(
        repo: R,
        catalog: Arc<dyn ProductCatalog>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            repo,
            pricing: PricingEngine::new(catalog),
            guard: OwnershipGuard::new(accounts),
            status: StatusMachine::default(),
        }
    }

    pub fn with_transition_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.status = StatusMachine::new(policy);
        self
    }

    /// Checkout: ownership guard, then pricing, then a single atomic write.
    #[instrument(skip(self, cart, anonymous_token), fields(items = cart.items.len()))]
    pub async fn create_order(
        &self,
        cart: Cart,
        account_id: Option<AccountId>,
        anonymous_token: Option<&str>,
    ) -> Result<Order, AppError> {
        self.guard
            .authorize_order_email(&cart.customer.email, account_id)
            .await?;
        let owner = Owner::resolve(account_id, anonymous_token);
        let priced = self.pricing.price(cart, owner).await.inspect_err(|e| {
            warn!(error = %e, "checkout rejected");
        })?;
        let order = self.repo.create(priced).await?;
        info!(order_id = order.id, total = order.total, "order created");
        Ok(order)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.repo.get(id).await?.ok_or_else(AppError::order_not_found)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, filters: &HashMap<String, String>) -> Result<Vec<Order>, AppError> {
        let query = parse_filters(filters)?;
        Ok(self.repo.list(&query).await?)
    }

    /// Order history for whoever is calling: an account, or a guest session.
    pub async fn list_orders_for_owner(
        &self,
        account_id: Option<AccountId>,
        anonymous_token: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        let owner = match Owner::resolve(account_id, anonymous_token) {
            Owner::Unowned => {
                return Err(AppError::bad_request(
                    "an account or session token is required",
                ))
            }
            Owner::Account { account_id } => {
                self.guard.resolve_account(account_id).await?;
                Owner::Account { account_id }
            }
            anonymous => anonymous,
        };
        Ok(self.repo.list(&OrderQuery::owned_by(owner)).await?)
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, new_status: &str) -> Result<Order, AppError> {
        let to = StatusMachine::parse_status(new_status)?;
        let mut order = self.get_order(id).await?;
        let from = order.status;
        self.status.apply(&mut order, to)?;
        let updated = self
            .repo
            .update_status(id, order.status, order.updated_at)
            .await?
            .ok_or_else(AppError::order_not_found)?;
        info!(order_id = id, %from, to = %updated.status, "order status changed");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<(), AppError> {
        if self.repo.delete(id).await? {
            info!(order_id = id, "order deleted");
            Ok(())
        } else {
            Err(AppError::order_not_found())
        }
    }
}
