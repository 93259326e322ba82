//! Authenticated API client for the learning platform
//!
//! Wraps outgoing HTTP calls with bearer-credential attachment and transparent
//! single-flight token refresh. Feature modules (goals, challenges, tutoring,
//! leaderboards) call [`ApiClient::send`] and receive either a normal response
//! or a classified [`ApiError`]; they are unaware of refresh mechanics. The
//! UI/session layer subscribes to the [`SessionBus`] and reacts to exactly one
//! session-ended event when a refresh fails irrecoverably.
//!
//! Request flow:
//! 1. Pipeline attaches `Authorization: Bearer <credential>` if one is stored
//! 2. Transport executes the request
//! 3. A 401 on a first attempt hands off to the refresh coordinator, which
//!    calls the refresh endpoint at most once per expiry regardless of how
//!    many requests fail concurrently, then the request is retried once
//! 4. Every other failure class is surfaced to the caller immediately

pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod request;
pub mod transport;

pub use classify::{ResponseClass, classify_status, classify_transport_error};
pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use coordinator::RefreshCoordinator;
pub use error::ApiError;
pub use events::{SessionBus, SessionEndReason, SessionEndedEvent};
pub use request::{ApiResponse, PreparedRequest, RequestDescriptor};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
