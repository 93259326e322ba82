//! Caller-facing error taxonomy
//!
//! A successful silent refresh never surfaces here. Everything else maps to
//! exactly one variant: `AuthExpired` is final (refresh failed, or a retried
//! request was still unauthorized), the rest are surfaced immediately with
//! no retry by this layer.

use thiserror::Error;

/// Errors returned to feature modules by [`crate::ApiClient::send`].
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("session expired and could not be renewed")]
    AuthExpired,

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected ({status}): {body}")]
    Client { status: u16, body: String },
}

impl ApiError {
    /// Normalized, user-presentable message for this failure.
    ///
    /// Client errors pass the server's body through unchanged — the feature
    /// module owns its own 4xx semantics (validation messages etc.).
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AuthExpired => "Your session has expired. Please sign in again.".into(),
            ApiError::Server { .. } => {
                "Something went wrong on our end. Please try again later.".into()
            }
            ApiError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".into()
            }
            ApiError::Client { body, .. } => body.clone(),
        }
    }
}
