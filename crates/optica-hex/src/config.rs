use anyhow::Context;
use optica_types::ports::order_repository::DEFAULT_ACQUIRE_TIMEOUT;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub db_acquire_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();
        let db_acquire_timeout = match env::var("DB_ACQUIRE_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout_secs(&raw)?,
            Err(_) => DEFAULT_ACQUIRE_TIMEOUT,
        };
        Ok(Self {
            server_port,
            database_url,
            db_acquire_timeout,
        })
    }
}

fn parse_timeout_secs(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("DB_ACQUIRE_TIMEOUT_SECS must be an integer, got {raw:?}"))?;
    anyhow::ensure!(secs > 0, "DB_ACQUIRE_TIMEOUT_SECS must be positive");
    Ok(Duration::from_secs(secs))
}
