//! Single-flight refresh coordinator
//!
//! At most one refresh call is in flight against the auth server at any
//! time, regardless of how many requests observe a 401 concurrently. The
//! first observer starts the refresh episode; everyone, starter included,
//! enqueues a oneshot waiter and suspends until the episode drains the
//! queue. Without this, N concurrently failing requests would each hit the
//! refresh endpoint, racing to invalidate each other's new credential.
//!
//! The episode itself runs on a detached task, so it always settles and
//! drains even if the caller that started it is cancelled (e.g. a `send`
//! wrapped in `select!` or an outer timeout). No waiter can be stranded by
//! the disappearance of any individual caller.
//!
//! Episode lifecycle:
//! - success: new credential written to the store, then broadcast to every
//!   waiter; each caller retries its original request exactly once
//! - failure (rejection, transport error, or timeout alike): store cleared,
//!   every waiter rejected with a clone of the same error, exactly one
//!   `RefreshFailed` event published
//!
//! The queue and the `is_refreshing` flag live behind one mutex that is
//! never held across an await. Draining takes the queue and resets the flag
//! in a single critical section, so a caller arriving mid-drain either
//! joined the queue before the take (and gets the broadcast) or starts a
//! fresh episode — no lost wakeups.

use std::sync::Arc;
use std::time::Duration;

use session_auth::{AccessCredential, CredentialStore, Error, RefreshTransport, Result};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::events::{SessionBus, SessionEndReason, SessionEndedEvent};

type Waiter = oneshot::Sender<Result<AccessCredential>>;

/// Mutable refresh-episode state. The queue is non-empty only while
/// `is_refreshing` is true.
#[derive(Default)]
struct RefreshState {
    is_refreshing: bool,
    waiters: Vec<Waiter>,
}

/// Coordinates credential refresh across concurrent failing requests.
///
/// All state is instance-owned so tests can run independent coordinators
/// in parallel without cross-test leakage.
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    refresher: Arc<dyn RefreshTransport>,
    store: Arc<CredentialStore>,
    bus: SessionBus,
    timeout: Duration,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn RefreshTransport>,
        store: Arc<CredentialStore>,
        bus: SessionBus,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                refresher,
                store,
                bus,
                timeout,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Obtain a fresh credential after a request came back 401.
    ///
    /// If a refresh is already in flight, suspends until that episode
    /// settles and returns its outcome. Otherwise spawns the episode and
    /// waits on it like everyone who queues up meanwhile. The episode task
    /// holds its own reference to the coordinator state, so dropping this
    /// future never strands other waiters.
    pub async fn credential_after_refresh(&self) -> Result<AccessCredential> {
        let (tx, rx) = oneshot::channel();
        let leads = {
            let mut state = self.inner.state.lock().await;
            state.waiters.push(tx);
            if state.is_refreshing {
                debug!(queued = state.waiters.len(), "refresh in flight, queueing");
                false
            } else {
                state.is_refreshing = true;
                true
            }
        };

        if leads {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                let outcome = inner.run_refresh().await;
                inner.settle(&outcome).await;
                inner.drain(outcome).await;
            });
        }

        match rx.await {
            Ok(outcome) => outcome,
            // The episode task was torn down without draining (runtime
            // shutdown); the episode produced no credential.
            Err(_) => Err(Error::Http("refresh abandoned before completion".into())),
        }
    }
}

impl Inner {
    /// One refresh call under the configured deadline. A timeout is treated
    /// identically to an explicit rejection.
    async fn run_refresh(&self) -> Result<AccessCredential> {
        debug!("starting refresh call");
        match tokio::time::timeout(self.timeout, self.refresher.refresh()).await {
            Ok(Ok(grant)) => Ok(grant.into_credential()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
        }
    }

    /// Apply the episode outcome to the store and, on failure, the bus.
    async fn settle(&self, outcome: &Result<AccessCredential>) {
        match outcome {
            Ok(credential) => {
                // Persist failure is not fatal: the in-memory slot still
                // carries the credential for this process lifetime.
                if let Err(e) = self.store.set(credential.clone()).await {
                    warn!(error = %e, "failed to persist refreshed credential");
                }
                info!("credential refresh succeeded");
            }
            Err(e) => {
                warn!(error = %e, "credential refresh failed, session is over");
                if let Err(storage) = self.store.clear().await {
                    warn!(error = %storage, "failed to clear credential store");
                }
                self.bus.publish(SessionEndedEvent {
                    reason: SessionEndReason::RefreshFailed,
                });
            }
        }
    }

    /// Resolve every queued waiter and end the episode.
    ///
    /// Queue take and flag reset happen in one critical section: anyone who
    /// enqueued before this point receives the broadcast, anyone after it
    /// finds the coordinator idle and leads a new episode.
    async fn drain(&self, outcome: Result<AccessCredential>) {
        let waiters = {
            let mut state = self.state.lock().await;
            state.is_refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        let drained = waiters.len();
        for waiter in waiters {
            // A send fails only if the waiting caller is gone; nothing to do.
            let _ = waiter.send(outcome.clone());
        }
        debug!(waiters = drained, "refresh episode drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use session_auth::TokenGrant;

    #[derive(Clone)]
    enum Script {
        Grant(&'static str),
        Reject(u16),
        Hang,
    }

    /// Refresh transport with a controlled delay and call counter.
    struct MockRefresher {
        calls: AtomicUsize,
        delay: Duration,
        script: Script,
    }

    impl MockRefresher {
        fn new(delay_ms: u64, script: Script) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(delay_ms),
                script,
            })
        }
    }

    impl RefreshTransport for MockRefresher {
        fn refresh(&self) -> Pin<Box<dyn Future<Output = Result<TokenGrant>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            let script = self.script.clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                match script {
                    Script::Grant(token) => Ok(TokenGrant {
                        access_token: token.into(),
                    }),
                    Script::Reject(status) => Err(Error::Rejected {
                        status,
                        body: "session invalid".into(),
                    }),
                    Script::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        unreachable!("hung refresh must be cut off by the timeout")
                    }
                }
            })
        }
    }

    fn coordinator(
        refresher: Arc<MockRefresher>,
        store: Arc<CredentialStore>,
        bus: SessionBus,
    ) -> RefreshCoordinator {
        RefreshCoordinator::new(refresher, store, bus, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let refresher = MockRefresher::new(50, Script::Grant("tok2"));
        let store = Arc::new(CredentialStore::in_memory());
        let coord = coordinator(refresher.clone(), store.clone(), SessionBus::new());

        let (a, b, c) = tokio::join!(
            coord.credential_after_refresh(),
            coord.credential_after_refresh(),
            coord.credential_after_refresh(),
        );

        assert_eq!(a.unwrap().as_str(), "tok2");
        assert_eq!(b.unwrap().as_str(), "tok2");
        assert_eq!(c.unwrap().as_str(), "tok2");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().await.unwrap().as_str(), "tok2");
    }

    #[tokio::test]
    async fn failure_fans_out_to_all_waiters() {
        let refresher = MockRefresher::new(50, Script::Reject(500));
        let store = Arc::new(CredentialStore::in_memory());
        store
            .set(AccessCredential::new("tok_stale"))
            .await
            .unwrap();
        let bus = SessionBus::new();
        let mut events = bus.subscribe();
        let coord = coordinator(refresher.clone(), store.clone(), bus);

        let (a, b, c) = tokio::join!(
            coord.credential_after_refresh(),
            coord.credential_after_refresh(),
            coord.credential_after_refresh(),
        );

        for outcome in [a, b, c] {
            match outcome {
                Err(Error::Rejected { status, .. }) => assert_eq!(status, 500),
                other => panic!("expected rejection, got {other:?}"),
            }
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(store.get().await.is_none(), "store must end cleared");

        // Exactly one session-ended event for the whole episode
        assert_eq!(
            events.recv().await.unwrap().reason,
            SessionEndReason::RefreshFailed
        );
        assert!(matches!(
            events.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn hung_refresh_times_out_as_failure() {
        let refresher = MockRefresher::new(0, Script::Hang);
        let store = Arc::new(CredentialStore::in_memory());
        let bus = SessionBus::new();
        let mut events = bus.subscribe();
        let coord = RefreshCoordinator::new(
            refresher,
            store.clone(),
            bus,
            Duration::from_millis(20),
        );

        match coord.credential_after_refresh().await {
            Err(Error::Timeout(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(store.get().await.is_none());
        assert_eq!(
            events.recv().await.unwrap().reason,
            SessionEndReason::RefreshFailed
        );
    }

    #[tokio::test]
    async fn episodes_are_independent() {
        // A failed episode must not poison the next one.
        let store = Arc::new(CredentialStore::in_memory());
        let bus = SessionBus::new();

        let failing = MockRefresher::new(10, Script::Reject(500));
        let coord = coordinator(failing, store.clone(), bus.clone());
        assert!(coord.credential_after_refresh().await.is_err());

        let granting = MockRefresher::new(10, Script::Grant("tok3"));
        let coord = coordinator(granting.clone(), store.clone(), bus);
        assert_eq!(
            coord.credential_after_refresh().await.unwrap().as_str(),
            "tok3"
        );
        assert_eq!(granting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caller_arriving_after_drain_starts_new_episode() {
        let refresher = MockRefresher::new(10, Script::Grant("tok2"));
        let store = Arc::new(CredentialStore::in_memory());
        let coord = coordinator(refresher.clone(), store, SessionBus::new());

        coord.credential_after_refresh().await.unwrap();
        coord.credential_after_refresh().await.unwrap();

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn many_waiters_all_resolve() {
        // Liveness: none of the queued callers may remain pending forever.
        let refresher = MockRefresher::new(50, Script::Grant("tok2"));
        let store = Arc::new(CredentialStore::in_memory());
        let coord = Arc::new(coordinator(refresher.clone(), store, SessionBus::new()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coord = coord.clone();
            handles.push(tokio::spawn(
                async move { coord.credential_after_refresh().await },
            ));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().as_str(), "tok2");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_first_caller_does_not_strand_waiters() {
        // The caller that started the episode is aborted mid-refresh; the
        // episode still settles and the queued waiter still resolves.
        let refresher = MockRefresher::new(100, Script::Grant("tok2"));
        let store = Arc::new(CredentialStore::in_memory());
        let coord = Arc::new(coordinator(
            refresher.clone(),
            store.clone(),
            SessionBus::new(),
        ));

        let first = tokio::spawn({
            let coord = coord.clone();
            async move { coord.credential_after_refresh().await }
        });
        // Let the first caller start the episode, then queue a second caller.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let waiter = tokio::spawn({
            let coord = coord.clone();
            async move { coord.credential_after_refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter must not be stranded by a cancelled caller")
            .unwrap();
        assert_eq!(outcome.unwrap().as_str(), "tok2");

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().await.unwrap().as_str(), "tok2");

        // The coordinator is idle again: a later caller leads a new episode.
        coord.credential_after_refresh().await.unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }
}
