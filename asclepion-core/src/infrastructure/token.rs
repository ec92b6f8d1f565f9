//! Bearer credential acquisition.
//!
//! The token provider is a black box reached over plain HTTP `GET`; it
//! returns a short-lived credential that is never cached here — every
//! dispatch fetches a fresh one.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Short-lived opaque credential for the clinical-records API.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("token endpoint returned an invalid body: {source}")]
    InvalidBody {
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<BearerToken, TokenError>;
}

/// Fetches tokens from the companion token service.
pub struct HttpTokenProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpTokenProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: super::http_client(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self) -> Result<BearerToken, TokenError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|source| TokenError::InvalidBody { source })
    }
}
