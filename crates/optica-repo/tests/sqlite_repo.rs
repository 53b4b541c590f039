#![cfg(feature = "sqlite")]

use chrono::{Duration, TimeZone, Utc};
use optica_repo::sqlite::SqliteRepo;
use optica_types::domain::order::{CustomerInfo, NewLineItem, NewOrder, OrderStatus, Owner};
use optica_types::domain::query::{DateRange, OrderQuery};
use optica_types::ports::accounts::AccountDirectory;
use optica_types::ports::catalog::ProductCatalog;
use optica_types::ports::order_repository::OrderRepository;
use std::path::PathBuf;

fn temp_db_url() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut path = PathBuf::from(dir.path());
    path.push("orders.db");
    let url = format!("sqlite://{}", path.display());
    (dir, url)
}

fn customer(email: &str) -> CustomerInfo {
    CustomerInfo {
        name: "Test".into(),
        email: email.into(),
        phone: Some("+56911111111".into()),
        address: "Calle 1".into(),
        observations: Some("timbre malo".into()),
    }
}

fn line(product_id: i64, quantity: u32, unit_price: i64) -> NewLineItem {
    NewLineItem {
        product_id,
        quantity,
        unit_price,
    }
}

#[tokio::test]
async fn sqlite_repo_crud_flow() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 10_000).await.unwrap();
    let case = repo.insert_product("Estuche", 2_500).await.unwrap();

    let order = NewOrder::new(
        customer("test@example.com"),
        Owner::Anonymous {
            session_id: "guest-9".into(),
        },
        vec![line(lens.id, 2, 10_000), line(case.id, 1, 2_500)],
    )
    .unwrap();

    let created = repo.create(order).await.unwrap();
    assert_eq!(created.total, 22_500);

    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.customer, customer("test@example.com"));
    assert_eq!(
        fetched.owner,
        Owner::Anonymous {
            session_id: "guest-9".into()
        }
    );
    assert_eq!(fetched.created_at, created.created_at);
    // Insertion order is preserved.
    let names: Vec<_> = fetched
        .items
        .iter()
        .map(|it| it.product.as_ref().unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["Lente", "Estuche"]);

    let later = fetched.updated_at + Duration::seconds(1);
    let updated = repo
        .update_status(created.id, OrderStatus::Shipped, later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.updated_at, later);
    assert_eq!(updated.total, 22_500);

    let deleted = repo.delete(created.id).await.unwrap();
    assert!(deleted);
    assert!(repo.get(created.id).await.unwrap().is_none());
    assert_eq!(repo.count_line_items(Some(created.id)).await.unwrap(), 0);
}

#[tokio::test]
async fn sqlite_repo_handles_missing_rows() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();

    assert!(repo.get(404).await.unwrap().is_none());
    let updated = repo
        .update_status(404, OrderStatus::Shipped, Utc::now())
        .await
        .unwrap();
    assert!(updated.is_none());
    assert!(!repo.delete(404).await.unwrap());
}

#[tokio::test]
async fn failed_line_item_insert_rolls_back_the_order() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 10_000).await.unwrap();

    // The second line points at a product that does not exist, so the
    // foreign key rejects it after the order row was already inserted.
    let order = NewOrder::new(
        customer("a@x.com"),
        Owner::Unowned,
        vec![line(lens.id, 1, 10_000), line(9_999, 1, 1)],
    )
    .unwrap();
    assert!(repo.create(order).await.is_err());

    assert!(repo.list(&OrderQuery::default()).await.unwrap().is_empty());
    assert_eq!(repo.count_line_items(None).await.unwrap(), 0);
}

#[tokio::test]
async fn product_changes_never_touch_stored_prices() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 10_000).await.unwrap();
    let created = repo
        .create(NewOrder::new(customer("a@x.com"), Owner::Unowned, vec![line(lens.id, 2, 10_000)]).unwrap())
        .await
        .unwrap();

    repo.set_product_price(lens.id, 15_000).await.unwrap();
    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.items[0].unit_price, 10_000);
    assert_eq!(fetched.items[0].product.as_ref().unwrap().current_price, 15_000);
    assert_eq!(fetched.total, 20_000);

    assert!(repo.delete_product(lens.id).await.unwrap());
    let fetched = repo.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].product_id, None);
    assert!(fetched.items[0].product.is_none());
    assert_eq!(fetched.total, 20_000);
}

#[tokio::test]
async fn list_applies_filters_in_sql() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 100).await.unwrap();

    let day1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let mut first = NewOrder::new(customer("a@x.com"), Owner::Unowned, vec![line(lens.id, 1, 100)]).unwrap();
    first.created_at = day1;
    let mut second = NewOrder::new(
        customer("b@x.com"),
        Owner::Account { account_id: 1 },
        vec![line(lens.id, 1, 100)],
    )
    .unwrap();
    second.created_at = day1 + Duration::days(1);
    // account_id references accounts(id)
    repo.insert_account("b@x.com").await.unwrap();

    let first = repo.create(first).await.unwrap();
    let second = repo.create(second).await.unwrap();

    let by_day = OrderQuery {
        created: DateRange::new(day1 - Duration::hours(12), day1 + Duration::hours(11)),
        ..OrderQuery::default()
    };
    let found = repo.list(&by_day).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, first.id);

    let by_email = OrderQuery {
        email: Some("b@x.com".into()),
        ..OrderQuery::default()
    };
    let found = repo.list(&by_email).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, second.id);

    let by_owner = repo
        .list(&OrderQuery::owned_by(Owner::Account { account_id: 1 }))
        .await
        .unwrap();
    assert_eq!(by_owner.len(), 1);
    assert_eq!(by_owner[0].id, second.id);

    let newest_first: Vec<_> = repo
        .list(&OrderQuery::default())
        .await
        .unwrap()
        .iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(newest_first, vec![second.id, first.id]);

    let pending = OrderQuery {
        status: Some(OrderStatus::Delivered),
        ..OrderQuery::default()
    };
    assert!(repo.list(&pending).await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_and_accounts_lookups() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let a = repo.insert_product("A", 1).await.unwrap();
    let found = repo.find_products_by_ids(&[a.id, 77]).await.unwrap();
    assert_eq!(found, vec![a]);
    assert!(repo.find_products_by_ids(&[]).await.unwrap().is_empty());

    let acc = repo.insert_account("ana@x.com").await.unwrap();
    assert_eq!(repo.find_account_by_id(acc.id).await.unwrap(), Some(acc.clone()));
    assert_eq!(repo.find_account_by_email("ana@x.com").await.unwrap(), Some(acc));
    assert!(repo.find_account_by_id(999).await.unwrap().is_none());
}

fn wide_range(from_year: i32, to_year: i32) -> Option<DateRange> {
    DateRange::new(
        Utc.with_ymd_and_hms(from_year, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(to_year, 1, 1, 0, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn range_bounds_beyond_four_digit_years() {
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 100).await.unwrap();
    let created = repo
        .create(NewOrder::new(customer("a@x.com"), Owner::Unowned, vec![line(lens.id, 1, 100)]).unwrap())
        .await
        .unwrap();

    let until_far_future = OrderQuery {
        created: wide_range(2024, 10_000),
        ..OrderQuery::default()
    };
    let found = repo.list(&until_far_future).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, created.id);
    assert_eq!(found[0].items.len(), 1);

    let everything = OrderQuery {
        created: wide_range(-5, 12_000),
        ..OrderQuery::default()
    };
    assert_eq!(repo.list(&everything).await.unwrap().len(), 1);

    let long_ago = OrderQuery {
        created: wide_range(-5, 2000),
        ..OrderQuery::default()
    };
    assert!(repo.list(&long_ago).await.unwrap().is_empty());
}

#[cfg(feature = "memory")]
#[tokio::test]
async fn range_filters_agree_with_memory_adapter() {
    use optica_repo::memory::InMemoryRepo;

    let (_dir, url) = temp_db_url();
    let sqlite = SqliteRepo::new(&url).await.unwrap();
    let memory = InMemoryRepo::new();
    let sql_lens = sqlite.insert_product("Lente", 100).await.unwrap();
    let mem_lens = memory.insert_product("Lente", 100);
    sqlite
        .create(NewOrder::new(customer("a@x.com"), Owner::Unowned, vec![line(sql_lens.id, 1, 100)]).unwrap())
        .await
        .unwrap();
    memory
        .create(NewOrder::new(customer("a@x.com"), Owner::Unowned, vec![line(mem_lens.id, 1, 100)]).unwrap())
        .await
        .unwrap();

    for (from, to) in [(2024, 10_000), (-5, 12_000), (-5, 2000), (10_000, 12_000)] {
        let query = OrderQuery {
            created: wide_range(from, to),
            ..OrderQuery::default()
        };
        assert_eq!(
            sqlite.list(&query).await.unwrap().len(),
            memory.list(&query).await.unwrap().len(),
            "range {from}..={to}"
        );
    }
}

#[tokio::test]
async fn listing_more_orders_than_bind_variables() {
    const BULK: i64 = 40_000;
    let (_dir, url) = temp_db_url();
    let repo = SqliteRepo::new(&url).await.unwrap();
    let lens = repo.insert_product("Lente", 100).await.unwrap();

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query(
        "INSERT INTO orders (customer_name, customer_email, shipping_address, status, total, \
         created_at, updated_at) \
         WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?) \
         SELECT 'Bulk', 'bulk@x.com', 'Calle 1', 'pendiente', 100, \
         '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z' FROM n",
    )
    .bind(BULK)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
         SELECT id, ?, 1, 100 FROM orders",
    )
    .bind(lens.id)
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let all = repo.list(&OrderQuery::default()).await.unwrap();
    assert_eq!(all.len() as i64, BULK);
    assert!(all.iter().all(|o| o.items.len() == 1 && o.items_total() == Some(o.total)));

    let none = OrderQuery {
        email: Some("other@x.com".into()),
        ..OrderQuery::default()
    };
    assert!(repo.list(&none).await.unwrap().is_empty());
}
