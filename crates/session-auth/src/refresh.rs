//! Refresh endpoint client
//!
//! `POST /auth/refresh` exchanges a long-lived session reference for a new
//! access credential. The session reference is a cookie managed entirely by
//! the HTTP client's cookie store, so the request carries no body. The
//! success response is JSON: `{ "accessToken": "..." }`.
//!
//! The transport is behind a trait so the refresh coordinator can be tested
//! against mocks with controlled delays and failure modes.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::debug;

use crate::credential::AccessCredential;
use crate::error::{Error, Result};

/// Deserialized refresh endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

impl TokenGrant {
    /// Convert the grant into a credential.
    pub fn into_credential(self) -> AccessCredential {
        AccessCredential::new(self.access_token)
    }
}

/// One refresh call against the authentication server.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn RefreshTransport>`).
pub trait RefreshTransport: Send + Sync {
    /// Ask the auth server for a new access credential.
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<TokenGrant>> + Send + '_>>;
}

/// Real refresher posting to `{base_url}/auth/refresh`.
///
/// The client must carry a cookie store — the persistent session cookie is
/// the only thing identifying the session to the auth server.
pub struct HttpRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
        }
    }

    async fn post_refresh(&self) -> Result<TokenGrant> {
        let response = self
            .client
            .post(&self.url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| Error::InvalidGrant(e.to_string()))?;
        debug!("refresh endpoint granted new credential");
        Ok(grant)
    }
}

impl RefreshTransport for HttpRefresher {
    fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<TokenGrant>> + Send + '_>> {
        Box::pin(self.post_refresh())
    }
}
