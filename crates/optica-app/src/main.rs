use std::sync::Arc;

use optica_hex::application::order_service::OrderService;
use optica_hex::config::Config;
use optica_hex::inbound::http::{HttpServer, HttpServerConfig};
use optica_repo::Repo;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let repo = Repo::build_repo(config.database_url.as_deref(), config.db_acquire_timeout).await?;
    let service = OrderService::new(repo.clone(), Arc::new(repo.clone()), Arc::new(repo));

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(service, server_cfg).await?;
    http.run().await
}
