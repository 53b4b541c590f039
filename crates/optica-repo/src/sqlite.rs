use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use optica_types::domain::account::Account;
use optica_types::domain::order::{
    AccountId, Amount, CustomerInfo, NewOrder, Order, OrderId, OrderLineItem, OrderStatus, Owner,
    ProductId,
};
use optica_types::domain::product::Product;
use optica_types::domain::query::{OrderQuery, SortDirection, SortField};
use optica_types::ports::accounts::AccountDirectory;
use optica_types::ports::catalog::ProductCatalog;
use optica_types::ports::order_repository::{OrderRepository, RepoError, DEFAULT_ACQUIRE_TIMEOUT};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

const ORDER_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, shipping_address, \
     observations, status, total, account_id, anonymous_session_id, created_at, updated_at";

const ITEM_SELECT: &str = "SELECT li.id, li.order_id, li.product_id, li.quantity, li.unit_price, \
     p.name AS product_name, p.price AS product_price \
     FROM order_items li LEFT JOIN products p ON p.id = li.product_id WHERE ";

const EARLIEST_TS: &str = "0000-01-01T00:00:00.000000Z";
const LATEST_TS: &str = "9999-12-31T23:59:59.999999Z";

#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: String,
    observations: Option<String>,
    status: String,
    total: i64,
    account_id: Option<i64>,
    anonymous_session_id: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct DbLineItem {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    quantity: i64,
    unit_price: i64,
    product_name: Option<String>,
    product_price: Option<i64>,
}

#[derive(FromRow)]
struct DbProduct {
    id: i64,
    name: String,
    price: i64,
}

#[derive(FromRow)]
struct DbAccount {
    id: i64,
    email: String,
}

/// Fixed-width UTC text, so lexical order in SQL equals time order for
/// years 0000 to 9999. Stored timestamps always fall in that window.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A range bound outside the four-digit window is clamped to its edge, which
/// selects the same stored rows and keeps the text comparison valid.
fn ts_bound(at: DateTime<Utc>) -> String {
    match at.year() {
        y if y < 0 => EARLIEST_TS.to_string(),
        y if y > 9999 => LATEST_TS.to_string(),
        _ => ts(at),
    }
}

/// Appends the `WHERE` conditions of `query` to a statement over `orders`
/// that already ends in a `WHERE` clause.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &OrderQuery) {
    if let Some(email) = &query.email {
        qb.push(" AND customer_email = ").push_bind(email.clone());
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(range) = query.created {
        qb.push(" AND created_at >= ").push_bind(ts_bound(range.from()));
        qb.push(" AND created_at <= ").push_bind(ts_bound(range.to()));
    }
    match &query.owner {
        Some(Owner::Account { account_id }) => {
            qb.push(" AND account_id = ").push_bind(*account_id);
        }
        Some(Owner::Anonymous { session_id }) => {
            qb.push(" AND anonymous_session_id = ").push_bind(session_id.clone());
        }
        Some(Owner::Unowned) => {
            qb.push(" AND account_id IS NULL AND anonymous_session_id IS NULL");
        }
        None => {}
    }
}

/// Runs a line item query built from [`ITEM_SELECT`] and groups rows by order.
async fn load_items(
    conn: &mut SqliteConnection,
    mut qb: QueryBuilder<'_, Sqlite>,
) -> Result<HashMap<OrderId, Vec<OrderLineItem>>, RepoError> {
    qb.push(" ORDER BY li.id");
    let rows: Vec<DbLineItem> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;
    let mut by_order: HashMap<OrderId, Vec<OrderLineItem>> = HashMap::new();
    for row in rows {
        let order_id = row.order_id;
        by_order
            .entry(order_id)
            .or_default()
            .push(row.into_line_item()?);
    }
    Ok(by_order)
}

fn hydrate(
    rows: Vec<DbOrder>,
    mut items: HashMap<OrderId, Vec<OrderLineItem>>,
) -> Result<Vec<Order>, RepoError> {
    rows.into_iter()
        .map(|r| {
            let lines = items.remove(&r.id).unwrap_or_default();
            r.into_order(lines)
        })
        .collect()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| RepoError::DbError(e.to_string()))?
        .with_timezone(&Utc))
}

fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::PoolTimedOut => RepoError::Unavailable(e.to_string()),
        // SQLITE_BUSY / SQLITE_LOCKED
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("5") | Some("6")) => {
            RepoError::Unavailable(e.to_string())
        }
        _ => RepoError::DbError(e.to_string()),
    }
}

impl DbLineItem {
    fn into_line_item(self) -> Result<OrderLineItem, RepoError> {
        let quantity =
            u32::try_from(self.quantity).map_err(|e| RepoError::DbError(e.to_string()))?;
        let product = match (self.product_id, self.product_name, self.product_price) {
            (Some(id), Some(name), Some(current_price)) => Some(Product {
                id,
                name,
                current_price,
            }),
            _ => None,
        };
        Ok(OrderLineItem {
            id: self.id,
            product_id: self.product_id,
            quantity,
            unit_price: self.unit_price,
            product,
        })
    }
}

impl DbOrder {
    fn into_order(self, items: Vec<OrderLineItem>) -> Result<Order, RepoError> {
        let status = OrderStatus::from_str(&self.status)
            .map_err(|_| RepoError::DbError(format!("unknown status {:?}", self.status)))?;
        Ok(Order {
            id: self.id,
            customer: CustomerInfo {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                address: self.shipping_address,
                observations: self.observations,
            },
            status,
            total: self.total,
            owner: Owner::from_columns(self.account_id, self.anonymous_session_id),
            items,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::with_acquire_timeout(database_url, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    pub async fn with_acquire_timeout(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        if in_memory {
            // Every connection to :memory: is its own database.
            pool_options = pool_options.max_connections(1);
        }
        let pool = pool_options.connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_orders.sql");
        pool.execute(ddl).await?;

        tracing::debug!(database_url, "sqlite repository ready");
        Ok(Self { pool })
    }

    pub async fn insert_product(&self, name: &str, price: Amount) -> anyhow::Result<Product> {
        let res = sqlx::query("INSERT INTO products (name, price) VALUES (?, ?)")
            .bind(name)
            .bind(price)
            .execute(&self.pool)
            .await?;
        Ok(Product {
            id: res.last_insert_rowid(),
            name: name.to_string(),
            current_price: price,
        })
    }

    pub async fn set_product_price(&self, id: ProductId, price: Amount) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE products SET price = ? WHERE id = ?")
            .bind(price)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Line items pointing at the product keep their snapshot and lose the
    /// reference (`ON DELETE SET NULL`).
    pub async fn delete_product(&self, id: ProductId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn insert_account(&self, email: &str) -> anyhow::Result<Account> {
        let res = sqlx::query("INSERT INTO accounts (email) VALUES (?)")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(Account {
            id: res.last_insert_rowid(),
            email: email.to_string(),
        })
    }

    /// Raw row count, for checking that nothing leaked past a failed write.
    pub async fn count_line_items(&self, order_id: Option<OrderId>) -> anyhow::Result<i64> {
        let count: i64 = match order_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create(&self, order: NewOrder) -> Result<Order, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let created_at = ts(order.created_at);
        let res = sqlx::query(
            "INSERT INTO orders (customer_name, customer_email, customer_phone, shipping_address, \
             observations, status, total, account_id, anonymous_session_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(&order.customer.observations)
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.owner.account_id())
        .bind(order.owner.session_id())
        .bind(&created_at)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let order_id = res.last_insert_rowid();

        let mut item_ids = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let res = sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            item_ids.push(res.last_insert_rowid());
        }

        // Dropping `tx` on any early return above rolls the whole write back.
        tx.commit().await.map_err(db_err)?;
        Ok(Order::from_new(order_id, order, item_ids))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepoError> {
        // One read transaction so the order and its lines come from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut qb = QueryBuilder::<Sqlite>::new(ITEM_SELECT);
        qb.push("li.order_id = ").push_bind(id);
        let items = load_items(&mut *tx, qb).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(hydrate(vec![row], items)?.pop())
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
        push_filters(&mut qb, query);
        let column = match query.sort.field {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        };
        let direction = match query.sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        qb.push(format!(" ORDER BY {column} {direction}, id {direction}"));
        let rows: Vec<DbOrder> = qb
            .build_query_as()
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        // Same filters again as a subquery: bound parameters stay constant
        // however many orders match.
        let mut items_qb = QueryBuilder::<Sqlite>::new(ITEM_SELECT);
        items_qb.push("li.order_id IN (SELECT id FROM orders WHERE 1 = 1");
        push_filters(&mut items_qb, query);
        items_qb.push(")");
        let items = load_items(&mut *tx, items_qb).await?;

        tx.commit().await.map_err(db_err)?;
        hydrate(rows, items)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Order>, RepoError> {
        let updated = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(ts(updated_at))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let res = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductCatalog for SqliteRepo {
    async fn find_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name, price FROM products WHERE id IN (");
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(")");
        let rows: Vec<DbProduct> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|r| Product {
                id: r.id,
                name: r.name,
                current_price: r.price,
            })
            .collect())
    }
}

#[async_trait]
impl AccountDirectory for SqliteRepo {
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> = sqlx::query_as("SELECT id, email FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| Account {
            id: r.id,
            email: r.email,
        }))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> =
            sqlx::query_as("SELECT id, email FROM accounts WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(|r| Account {
            id: r.id,
            email: r.email,
        }))
    }
}
