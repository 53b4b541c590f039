#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use optica_types::domain::account::Account;
use optica_types::domain::order::*;
use optica_types::domain::product::Product;
use optica_types::domain::query::OrderQuery;
use optica_types::ports::accounts::AccountDirectory;
use optica_types::ports::catalog::ProductCatalog;
use optica_types::ports::order_repository::{OrderRepository, RepoError, DEFAULT_ACQUIRE_TIMEOUT};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", not(feature = "memory")))]
const DEFAULT_DATABASE_URL: &str = "sqlite://optica.db";

/// Storage selected at startup. One value serves the order repository, the
/// catalog reader and the account directory.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $body,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $body,
        }
    };
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url, DEFAULT_ACQUIRE_TIMEOUT).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(url: Option<&str>, _: Duration) -> anyhow::Result<Self> {
        if url.is_some() {
            tracing::warn!("DATABASE_URL ignored: built without the `sqlite` feature");
        }
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(
        database_url: Option<&str>,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        let sqlite = sqlite::SqliteRepo::with_acquire_timeout(url, acquire_timeout).await?;
        Ok(Self::Sqlite(sqlite))
    }

    /// With both adapters compiled in, a URL selects SQLite and its absence
    /// selects memory.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(
        database_url: Option<&str>,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(
                sqlite::SqliteRepo::with_acquire_timeout(url, acquire_timeout).await?,
            )),
            None => Ok(Self::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub async fn insert_product(&self, name: &str, price: Amount) -> anyhow::Result<Product> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => Ok(repo.insert_product(name, price)),
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.insert_product(name, price).await,
        }
    }

    pub async fn set_product_price(&self, id: ProductId, price: Amount) -> anyhow::Result<bool> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => Ok(repo.set_product_price(id, price)),
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.set_product_price(id, price).await,
        }
    }

    pub async fn insert_account(&self, email: &str) -> anyhow::Result<Account> {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(repo) => Ok(repo.insert_account(email)),
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(repo) => repo.insert_account(email).await,
        }
    }
}

#[async_trait]
impl OrderRepository for Repo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        dispatch!(self, repo => repo.create(order).await)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        dispatch!(self, repo => repo.get(id).await)
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, repo => repo.list(query).await)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepoError> {
        dispatch!(self, repo => repo.update_status(id, status, updated_at).await)
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepoError> {
        dispatch!(self, repo => repo.delete(id).await)
    }
}

#[async_trait]
impl ProductCatalog for Repo {
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepoError> {
        dispatch!(self, repo => repo.find_products_by_ids(ids).await)
    }
}

#[async_trait]
impl AccountDirectory for Repo {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        dispatch!(self, repo => repo.find_account_by_id(id).await)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        dispatch!(self, repo => repo.find_account_by_email(email).await)
    }
}
