use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use optica_types::domain::order::AccountId;

use crate::errors::AppError;

/// Set by the authentication layer in front of this service.
pub const ACCOUNT_HEADER: &str = "x-account-id";
/// Opaque guest token chosen by the storefront client.
pub const SESSION_HEADER: &str = "x-session-token";

/// Who is calling, as far as the order core needs to know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub account_id: Option<AccountId>,
    pub session_token: Option<String>,
}

impl RequestIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let header = |name: &str| -> Result<Option<String>, AppError> {
            headers
                .get(name)
                .map(|v| {
                    v.to_str()
                        .map(|s| s.trim().to_string())
                        .map_err(|_| AppError::bad_request(format!("invalid {name} header")))
                })
                .transpose()
                .map(|v| v.filter(|s| !s.is_empty()))
        };

        let account_id = header(ACCOUNT_HEADER)?
            .map(|raw| {
                raw.parse::<AccountId>()
                    .map_err(|_| AppError::bad_request(format!("invalid {ACCOUNT_HEADER} header")))
            })
            .transpose()?;
        Ok(Self {
            account_id,
            session_token: header(SESSION_HEADER)?,
        })
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
