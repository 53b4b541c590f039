use std::sync::Arc;

use optica_hex::application::order_service::OrderService;
use optica_hex::inbound::http::identity::{ACCOUNT_HEADER, SESSION_HEADER};
use optica_hex::inbound::http::{HttpServer, HttpServerConfig};
use optica_repo::{build_repo, Repo};
use optica_types::domain::order::{Order, OrderStatus, Owner};
use serde_json::json;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn start() -> (Repo, String, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let config = HttpServerConfig {
        port: port.to_string(),
    };

    let repo = build_repo(None).await.expect("build repo");
    let service = OrderService::new(
        repo.clone(),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let server = HttpServer::new(service, config).await.unwrap();

    let addr = format!("http://127.0.0.1:{}", port);
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });

    // Give the server a moment to start.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    (repo, addr, handle)
}

fn cart(email: &str, product_id: i64, cantidad: serde_json::Value) -> serde_json::Value {
    json!({
        "customer": {
            "nombre": "HttpUser",
            "correo": email,
            "telefono": "+56911111111",
            "direccion": "Calle 1"
        },
        "productos": [{ "id": product_id, "cantidad": cantidad }]
    })
}

#[tokio::test]
async fn create_list_update_delete_over_http() {
    let (repo, addr, handle) = start().await;
    let lens = repo.insert_product("Lente", 10_000).await.unwrap();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", addr))
        .header(SESSION_HEADER, "guest-42")
        .json(&cart("http@example.com", lens.id, json!(2)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let created: Order = res.json().await.unwrap();
    assert_eq!(created.status, OrderStatus::Pending);
    assert_eq!(created.total, 20_000);
    assert_eq!(
        created.owner,
        Owner::Anonymous {
            session_id: "guest-42".into()
        }
    );

    let fetched: Order = client
        .get(format!("{}/orders/{}", addr, created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.customer.name, "HttpUser");
    assert_eq!(fetched.items[0].product.as_ref().unwrap().name, "Lente");

    let list: Vec<Order> = client
        .get(format!("{}/orders?correo=http@example.com&sort=createdAt_DESC", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, created.id);

    let mine: Vec<Order> = client
        .get(format!("{}/orders/mine", addr))
        .header(SESSION_HEADER, "guest-42")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    let res = client
        .patch(format!("{}/orders/{}/status", addr, created.id))
        .json(&json!({ "status": "enviada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let updated: Order = res.json().await.unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);

    let res = client
        .delete(format!("{}/orders/{}", addr, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], created.id);

    // stop server task
    handle.abort();
}

#[tokio::test]
async fn error_paths_map_to_status_codes() {
    let (repo, addr, handle) = start().await;
    let lens = repo.insert_product("Lente", 10_000).await.unwrap();
    let owner = repo.insert_account("a@x.com").await.unwrap();
    repo.insert_account("b@x.com").await.unwrap();
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/orders", addr))
        .json(&cart("a@x.com", lens.id, json!("muchos")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid quantity for product Lente");

    let res = client
        .post(format!("{}/orders", addr))
        .header(ACCOUNT_HEADER, owner.id.to_string())
        .json(&cart("b@x.com", lens.id, json!(1)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    let res = client
        .post(format!("{}/orders", addr))
        .header(ACCOUNT_HEADER, "9999")
        .json(&cart("a@x.com", lens.id, json!(1)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/orders", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/orders?fecha=2024-01-01", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid filter(s): fecha");

    let res = client
        .get(format!("{}/orders", addr))
        .query(&[("desde", "2024-01-01"), ("hasta", "+262142-12-31")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid date for hasta: +262142-12-31");

    let res = client
        .get(format!("{}/orders/{}", addr, 424242))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/orders/not-a-number", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = client
        .patch(format!("{}/orders/{}/status", addr, 424242))
        .json(&json!({ "status": "enviada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/orders/mine", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    let res = client.get(format!("{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    handle.abort();
}
