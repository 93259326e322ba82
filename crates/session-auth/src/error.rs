//! Error types for credential storage and token refresh
//!
//! The enum is `Clone` because a single failed refresh is fanned out to every
//! caller queued on it — each waiter receives its own copy of the same error.

/// Errors from credential storage and refresh operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("refresh endpoint rejected the session ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid refresh response: {0}")]
    InvalidGrant(String),

    #[error("refresh timed out after {0} seconds")]
    Timeout(u64),

    #[error("credential storage error: {0}")]
    Storage(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
