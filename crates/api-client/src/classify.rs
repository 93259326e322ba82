//! Failure classification for completed requests
//!
//! Pure functions mapping a response status (or a transport failure) to the
//! class that decides what the pipeline does next. `AuthExpired` is the only
//! class that engages the refresh coordinator; everything else is surfaced
//! to the caller unmodified apart from message normalization.

use crate::transport::TransportError;

/// Classification of a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 1xx/2xx/3xx — returned to the caller as-is.
    Success,
    /// 401 — eligible for refresh-and-retry (once).
    AuthExpired,
    /// 5xx — surfaced with a generic message, never retried here.
    ServerError,
    /// Timeout/connectivity — surfaced with an actionable message, never retried here.
    NetworkError,
    /// Other 4xx — passed through unchanged.
    ClientError,
}

/// Classify an HTTP status. Never returns `NetworkError`; transport-level
/// failures don't produce a status and classify via [`classify_transport_error`].
///
/// Informational 1xx responses are not failures and pass through to the
/// caller unchanged. Anything outside the standard ranges surfaces with the
/// generic server message.
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        100..=399 => ResponseClass::Success,
        401 => ResponseClass::AuthExpired,
        400 | 402..=499 => ResponseClass::ClientError,
        _ => ResponseClass::ServerError,
    }
}

/// Classify a transport failure (no response was produced).
pub fn classify_transport_error(_error: &TransportError) -> ResponseClass {
    ResponseClass::NetworkError
}
