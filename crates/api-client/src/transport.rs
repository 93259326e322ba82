//! HTTP transport abstraction
//!
//! The pipeline talks to the network through `HttpTransport` so tests can
//! substitute scripted fakes. The real implementation wraps a `reqwest`
//! client with a bounded per-request timeout; its cookie store carries the
//! persistent session reference the refresh endpoint relies on.

use std::future::Future;
use std::pin::Pin;

use crate::request::{ApiResponse, PreparedRequest};

/// A request failed before producing any HTTP response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Executes one prepared request against the network.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn HttpTransport>`).
pub trait HttpTransport: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: &'a PreparedRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>>;
}

/// Real transport delegating to `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn run(&self, request: &PreparedRequest<'_>) -> Result<ApiResponse, TransportError> {
        let descriptor = request.descriptor;
        let url = format!("{}{}", self.base_url, descriptor.path);

        let mut builder = self.client.request(descriptor.method.clone(), &url);
        for (name, value) in &descriptor.headers {
            builder = builder.header(name, value);
        }
        if let Some(credential) = &request.credential {
            builder = builder.header(reqwest::header::AUTHORIZATION, credential.bearer());
        }
        if let Some(body) = &descriptor.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        Ok(ApiResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: &'a PreparedRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>> {
        Box::pin(self.run(request))
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let transport = ReqwestTransport::new(reqwest::Client::new(), "https://api.example.com/");
        assert_eq!(transport.base_url, "https://api.example.com");
    }

    #[test]
    fn transport_error_display_includes_cause() {
        let err = TransportError::Connect("dns failure".into());
        assert!(err.to_string().contains("dns failure"));
    }
}
