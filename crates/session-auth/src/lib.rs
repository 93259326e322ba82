//! Session authentication primitives for the learning-platform API client
//!
//! Owns the access credential type, its persistent single-slot store, and the
//! client for the `/auth/refresh` endpoint. The refresh *coordination* (single
//! flight, waiter queue, session-ended signalling) lives in `api-client`; this
//! crate only knows how to hold a credential and how to ask the auth server
//! for a new one.

pub mod credential;
pub mod error;
pub mod refresh;
pub mod store;

pub use credential::AccessCredential;
pub use error::{Error, Result};
pub use refresh::{HttpRefresher, RefreshTransport, TokenGrant};
pub use store::CredentialStore;
