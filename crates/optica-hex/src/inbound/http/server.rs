use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::identity::RequestIdentity;
use crate::application::order_service::OrderService;
use crate::errors::AppError;
use optica_types::domain::cart::Cart;
use optica_types::domain::order::{Order, OrderId};
use optica_types::ports::order_repository::OrderRepository;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer<R>
where
    R: OrderRepository,
{
    pub service: Arc<OrderService<R>>,
    pub config: HttpServerConfig,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Serialize)]
struct DeletedResponse {
    message: &'static str,
    id: OrderId,
}

impl<R> HttpServer<R>
where
    R: OrderRepository + Send + Sync + 'static,
{
    pub async fn new(service: OrderService<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/orders", get(list_orders::<R>).post(create_order::<R>))
            .route("/orders/mine", get(my_orders::<R>))
            .route("/orders/{id}", get(get_order::<R>).delete(delete_order::<R>))
            .route("/orders/{id}/status", patch(update_status::<R>))
            .layer(trace_layer)
            .layer(CorsLayer::permissive())
            .with_state(self.service.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<OrderId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid order id: {raw}")))
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn create_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    identity: RequestIdentity,
    payload: Result<Json<Cart>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let Json(cart) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let order = service
        .create_order(cart, identity.account_id, identity.session_token())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let order = service.get_order(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn list_orders<R>(
    State(service): State<Arc<OrderService<R>>>,
    Query(filters): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Order>>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let list = service.list_orders(&filters).await?;
    Ok(Json(list))
}

async fn my_orders<R>(
    State(service): State<Arc<OrderService<R>>>,
    identity: RequestIdentity,
) -> Result<Json<Vec<Order>>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let list = service
        .list_orders_for_owner(identity.account_id, identity.session_token())
        .await?;
    Ok(Json(list))
}

async fn update_status<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let updated = service.set_status(parse_id(&id)?, &body.status).await?;
    Ok(Json(updated))
}

async fn delete_order<R>(
    State(service): State<Arc<OrderService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError>
where
    R: OrderRepository + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    service.delete_order(id).await?;
    Ok(Json(DeletedResponse {
        message: "order deleted",
        id,
    }))
}
