use std::sync::Arc;

use optica_types::domain::order::{Order, OrderStatus};

use crate::errors::AppError;

/// Decides whether an order may move between two statuses.
pub trait TransitionPolicy: Send + Sync {
    fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool;
}

/// Any status may follow any other, including going back to `pendiente`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyTransition;

impl TransitionPolicy for AnyTransition {
    fn allows(&self, _from: OrderStatus, _to: OrderStatus) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct StatusMachine {
    policy: Arc<dyn TransitionPolicy>,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new(Arc::new(AnyTransition))
    }
}

impl StatusMachine {
    pub fn new(policy: Arc<dyn TransitionPolicy>) -> Self {
        Self { policy }
    }

    pub fn parse_status(raw: &str) -> Result<OrderStatus, AppError> {
        raw.trim()
            .parse()
            .map_err(|_| AppError::bad_request("invalid status"))
    }

    /// Sets the status and bumps `updated_at`. Nothing else on the order changes.
    pub fn apply(&self, order: &mut Order, to: OrderStatus) -> Result<(), AppError> {
        if !self.policy.allows(order.status, to) {
            return Err(AppError::bad_request(format!(
                "status transition {} -> {} is not allowed",
                order.status, to
            )));
        }
        order.set_status(to);
        Ok(())
    }
}
