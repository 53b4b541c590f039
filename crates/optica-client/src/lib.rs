use std::time::Duration;

use anyhow::Context;
use optica_types::domain::cart::Cart;
use optica_types::domain::order::{AccountId, Order, OrderId, OrderStatus};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const SESSION_HEADER: &str = "x-session-token";

/// A non-2xx answer from the order API, carrying the server's `error` text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order api returned {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

#[derive(Clone)]
pub struct OpticaClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct OpticaClient {
    base: Url,
    client: reqwest::Client,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeletedOrder {
    pub message: String,
    pub id: OrderId,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl OpticaClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<OpticaClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(OpticaClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    async fn read<T>(res: reqwest::Response) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = res.status();
        if status.is_success() {
            return Ok(res.json().await?);
        }
        let text = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        tracing::debug!(status = status.as_u16(), %message, "order api error");
        Err(ApiError {
            status: status.as_u16(),
            message,
        }
        .into())
    }

    pub async fn create_order(&self, cart: &Cart) -> anyhow::Result<Order> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(cart)
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn get_order(&self, id: OrderId) -> anyhow::Result<Order> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        Self::read(res).await
    }

    /// Admin listing. Filters are passed through as query parameters.
    pub async fn list_orders(&self, filters: &[(&str, &str)]) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("orders")?)
            .query(filters)
            .send()
            .await?;
        Self::read(res).await
    }

    /// Orders owned by the account or session this client was built with.
    pub async fn my_orders(&self) -> anyhow::Result<Vec<Order>> {
        let res = self
            .client
            .get(self.url("orders/mine")?)
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> anyhow::Result<Order> {
        let res = self
            .client
            .patch(self.url(&format!("orders/{id}/status"))?)
            .json(&UpdateStatusRequest { status })
            .send()
            .await?;
        Self::read(res).await
    }

    pub async fn delete_order(&self, id: OrderId) -> anyhow::Result<DeletedOrder> {
        let res = self
            .client
            .delete(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        Self::read(res).await
    }
}

impl OpticaClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.headers
            .insert(ACCOUNT_HEADER, HeaderValue::from(account_id));
        self
    }

    pub fn with_session_token(self, token: impl AsRef<str>) -> anyhow::Result<Self> {
        self.with_header(SESSION_HEADER, token)
    }

    /// Supplying a client bypasses the configured headers and timeout.
    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<OpticaClient> {
        if let Some(client) = self.client {
            return Ok(OpticaClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(OpticaClient {
            base: self.base,
            client,
        })
    }
}
