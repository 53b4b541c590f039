use async_trait::async_trait;

use crate::domain::account::Account;
use crate::domain::order::AccountId;
use crate::ports::RepoError;

#[async_trait]
pub trait AccountDirectory: Send + Sync + 'static {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError>;
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError>;
}
