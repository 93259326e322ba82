//! Access credential wrapper
//!
//! The credential is an opaque short-lived bearer token. Its expiry is not
//! tracked client-side — expiry is discovered when a request comes back 401.
//! The wrapper redacts the raw value in Debug/Display so it never leaks into
//! logs, and zeroizes the buffer on drop.

use std::fmt;

use zeroize::Zeroize;

/// Opaque short-lived access token authorizing API calls.
pub struct AccessCredential(String);

impl AccessCredential {
    /// Wrap a raw token value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Expose the raw token (use sparingly).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the `Authorization` header value for this credential.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessCredential([REDACTED])")
    }
}

impl fmt::Display for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for AccessCredential {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Clone for AccessCredential {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for AccessCredential {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
