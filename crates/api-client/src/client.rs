//! Request pipeline
//!
//! `ApiClient::send` is the single entry point feature modules use. It
//! attaches the stored credential, delegates to the transport, and
//! intercepts 401s: a first-attempt 401 engages the refresh coordinator and
//! the request is replayed once with the broadcast credential; a 401 on the
//! replay is final. All other failures map straight to `ApiError` with no
//! retry at this layer.

use std::sync::Arc;
use std::time::Duration;

use session_auth::{CredentialStore, HttpRefresher, RefreshTransport};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::{ResponseClass, classify_status};
use crate::config::{ClientConfig, ConfigError};
use crate::coordinator::RefreshCoordinator;
use crate::error::ApiError;
use crate::events::{SessionBus, SessionEndReason, SessionEndedEvent};
use crate::request::{ApiResponse, PreparedRequest, RequestDescriptor};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Authenticated HTTP client with transparent single-flight token refresh.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    bus: SessionBus,
}

impl ApiClient {
    /// Assemble a client from its parts. Tests inject fakes here; production
    /// code goes through [`ApiClient::from_config`].
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        refresher: Arc<dyn RefreshTransport>,
        store: Arc<CredentialStore>,
        bus: SessionBus,
        refresh_timeout: Duration,
    ) -> Self {
        let coordinator =
            RefreshCoordinator::new(refresher, store.clone(), bus.clone(), refresh_timeout);
        Self {
            transport,
            store,
            coordinator,
            bus,
        }
    }

    /// Build the production client: one reqwest client (with a cookie store
    /// carrying the persistent session reference) shared by the transport
    /// and the refresher, plus the configured credential store.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Config(format!("building http client: {e}")))?;

        let store = match &config.credential_path {
            Some(path) => CredentialStore::open(path.clone()).await,
            None => CredentialStore::in_memory(),
        };

        Ok(Self::new(
            Arc::new(ReqwestTransport::new(http.clone(), &config.base_url)),
            Arc::new(HttpRefresher::new(http, &config.base_url)),
            Arc::new(store),
            SessionBus::new(),
            Duration::from_secs(config.refresh_timeout_secs),
        ))
    }

    /// The bus UI/session collaborators subscribe to.
    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    /// The store login/logout collaborators write to.
    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Explicit sign-out: clear the credential and announce it.
    pub async fn end_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear credential on logout");
        }
        self.bus.publish(SessionEndedEvent {
            reason: SessionEndReason::ExplicitLogout,
        });
    }

    /// Send a request, refreshing and replaying once on a 401.
    ///
    /// An absent credential sends the request unauthenticated and lets the
    /// server reject it if authentication is required — a 401 then engages
    /// the refresh path like any other.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let credential = self.store.get().await;
        let first = PreparedRequest::first(&descriptor, credential);

        let response = self.dispatch(request_id, &first).await?;
        let class = classify_status(response.status);
        if class != ResponseClass::AuthExpired {
            return finish(request_id, response, class);
        }

        debug!(%request_id, "unauthorized, engaging refresh coordinator");
        let fresh = self
            .coordinator
            .credential_after_refresh()
            .await
            .map_err(|e| {
                debug!(%request_id, error = %e, "refresh failed, surfacing final auth error");
                ApiError::AuthExpired
            })?;

        let retry = PreparedRequest::retry(&descriptor, fresh);
        let response = self.dispatch(request_id, &retry).await?;
        let class = classify_status(response.status);
        if class == ResponseClass::AuthExpired {
            // Still unauthorized with a fresh credential: final, never
            // re-enters the coordinator.
            warn!(%request_id, "retried request still unauthorized");
        }
        finish(request_id, response, class)
    }

    async fn dispatch(
        &self,
        request_id: Uuid,
        request: &PreparedRequest<'_>,
    ) -> Result<ApiResponse, ApiError> {
        debug!(
            %request_id,
            method = %request.descriptor.method,
            path = %request.descriptor.path,
            attempt = request.attempt,
            "dispatching request"
        );
        self.transport.execute(request).await.map_err(|e| {
            warn!(%request_id, error = %e, "transport failure");
            ApiError::Network(e.to_string())
        })
    }
}

/// Map a classified terminal response to the caller's result.
///
/// An `AuthExpired` here is final: the first-attempt 401 is intercepted
/// before this point, so this only sees a 401 that already survived the
/// refresh-and-retry path.
fn finish(
    request_id: Uuid,
    response: ApiResponse,
    class: ResponseClass,
) -> Result<ApiResponse, ApiError> {
    match class {
        ResponseClass::Success => Ok(response),
        ResponseClass::AuthExpired => Err(ApiError::AuthExpired),
        ResponseClass::ServerError => {
            warn!(%request_id, status = response.status, "server error");
            Err(ApiError::Server {
                status: response.status,
            })
        }
        ResponseClass::NetworkError => Err(ApiError::Network(response.body)),
        ResponseClass::ClientError => Err(ApiError::Client {
            status: response.status,
            body: response.body,
        }),
    }
}
