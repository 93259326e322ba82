//! Request and response types for the pipeline
//!
//! `RequestDescriptor` is what feature modules hand to the client. It is
//! never mutated by the pipeline: a retry after refresh is an internal
//! `PreparedRequest` copy carrying an incremented attempt count, so the
//! at-most-one-retry guarantee lives in data the caller can't touch.

use reqwest::Method;
use session_auth::AccessCredential;

/// An outbound request as described by a feature module.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the client's base URL, e.g. `/goals`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut descriptor = Self::new(Method::POST, path);
        descriptor.body = Some(body);
        descriptor
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// One attempt at a descriptor, with the credential resolved at send time.
///
/// `attempt` 0 is the original send; 1 is the single post-refresh retry.
/// A 401 on a retried attempt is final and never re-enters the coordinator.
#[derive(Debug)]
pub struct PreparedRequest<'a> {
    pub descriptor: &'a RequestDescriptor,
    pub credential: Option<AccessCredential>,
    pub attempt: u8,
}

impl<'a> PreparedRequest<'a> {
    pub fn first(descriptor: &'a RequestDescriptor, credential: Option<AccessCredential>) -> Self {
        Self {
            descriptor,
            credential,
            attempt: 0,
        }
    }

    /// The one retry allowed after a successful refresh.
    pub fn retry(descriptor: &'a RequestDescriptor, credential: AccessCredential) -> Self {
        Self {
            descriptor,
            credential: Some(credential),
            attempt: 1,
        }
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }
}

/// Response as seen by callers: status plus the raw body text.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
