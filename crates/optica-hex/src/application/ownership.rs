use std::sync::Arc;

use optica_types::domain::account::Account;
use optica_types::domain::order::AccountId;
use optica_types::ports::accounts::AccountDirectory;

use crate::errors::AppError;

/// Stops a signed-in buyer from filing an order under another registered
/// account's email. Unregistered contact emails are fine.
pub struct OwnershipGuard {
    accounts: Arc<dyn AccountDirectory>,
}

impl OwnershipGuard {
    pub fn new(accounts: Arc<dyn AccountDirectory>) -> Self {
        Self { accounts }
    }

    pub async fn resolve_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.accounts
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("authenticated account not found".into()))
    }

    pub async fn authorize_order_email(
        &self,
        submitted_email: &str,
        account_id: Option<AccountId>,
    ) -> Result<(), AppError> {
        let Some(account_id) = account_id else {
            return Ok(());
        };
        let account = self.resolve_account(account_id).await?;
        if account.email == submitted_email {
            return Ok(());
        }
        match self.accounts.find_account_by_email(submitted_email).await? {
            Some(other) if other.id != account.id => {
                tracing::warn!(
                    account_id = account.id,
                    other_account_id = other.id,
                    "order email belongs to another account"
                );
                Err(AppError::Conflict(
                    "email already associated with another account; use your session's email"
                        .into(),
                ))
            }
            _ => Ok(()),
        }
    }
}
