///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use optica_client::{ApiError, OpticaClient};
use optica_hex::application::order_service::OrderService;
use optica_hex::inbound::http::{HttpServer, HttpServerConfig};
use optica_repo::build_repo;
use optica_types::domain::cart::{Cart, CartItem};
use optica_types::domain::order::{CustomerInfo, OrderStatus};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("optica.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    let lens = repo.insert_product("Lente monofocal", 10_000).await?;
    let frame = repo.insert_product("Marco acetato", 35_000).await?;

    let service = OrderService::new(repo.clone(), Arc::new(repo.clone()), Arc::new(repo.clone()));
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // A guest checkout, identified only by its session token.
    let client = OpticaClient::builder(&addr)?
        .with_session_token("guest-example")?
        .build()?;
    let cart = Cart {
        customer: CustomerInfo {
            name: "Example".into(),
            email: "example@example.com".into(),
            phone: Some("+56911111111".into()),
            address: "Calle 1, Santiago".into(),
            observations: None,
        },
        items: vec![CartItem::new(lens.id, 2u32), CartItem::new(frame.id, 1u32)],
    };
    let created = client.create_order(&cart).await?;
    println!("Created order id={} total={}", created.id, created.total);
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.total, 55_000);

    // Catalog price changes never touch placed orders.
    repo.set_product_price(lens.id, 12_500).await?;
    let fetched = client.get_order(created.id).await?;
    println!("Fetched total={} after price change", fetched.total);
    assert_eq!(fetched.total, created.total);

    let mine = client.my_orders().await?;
    println!("Guest session has {} order(s)", mine.len());

    let updated = client
        .update_status(created.id, OrderStatus::Shipped)
        .await?;
    println!("Updated status={} for id {}", updated.status, updated.id);

    let listed = client
        .list_orders(&[("status", "enviada"), ("sort", "updatedAt_DESC")])
        .await?;
    println!("{} shipped order(s)", listed.len());

    match client.list_orders(&[("fecha", "2024-01-01")]).await {
        Ok(_) => println!("unexpected: unknown filter accepted"),
        Err(err) => match err.downcast_ref::<ApiError>() {
            Some(api) => println!("Rejected filter ({}): {}", api.status, api.message),
            None => return Err(err),
        },
    }

    let deleted = client.delete_order(created.id).await?;
    println!("{} id={}", deleted.message, deleted.id);

    handle.abort();
    Ok(())
}
