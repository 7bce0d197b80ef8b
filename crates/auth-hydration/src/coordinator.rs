//! Hydration coordinator.
//!
//! Establishes the one authoritative answer to "who is signed in" for the
//! process. Two provider inputs race for it:
//!
//! - the stream's initial-session event, and
//! - the one-shot session fetch.
//!
//! Whichever arrives first closes the hydration latch (see
//! [`crate::hydration_fsm`]); the other is discarded. After that, stream
//! events are applied as they arrive for the rest of the process lifetime.
//!
//! `initialize()` is memoised: every caller, concurrent or later, awaits the
//! same shared hydration future and receives the same subscription handle.

use crate::hydration_fsm::{HydrationInput, HydrationMachine, HydrationSource, HydrationState};
use crate::{
    AuthEvent, AuthEventCallback, AuthStore, ProviderError, Session, SessionProvider,
    SubscriptionHandle, User,
};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

type HydrationFuture = Shared<BoxFuture<'static, SubscriptionHandle>>;

/// Snapshot of the auth state, including the hydration latch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub session: Option<Arc<Session>>,
    pub loading: bool,
    pub has_hydrated: bool,
}

/// Coordinator tuning.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorOptions {
    /// Log every provider event at info instead of debug.
    pub verbose_auth_events: bool,
}

struct Latch {
    machine: HydrationMachine,
    source: Option<HydrationSource>,
}

/// Drives the single hydration sequence and owns all store writes.
pub struct HydrationCoordinator {
    provider: Arc<dyn SessionProvider>,
    store: Arc<AuthStore>,
    options: CoordinatorOptions,
    /// Guards the latch and serialises every store write behind it.
    latch: Mutex<Latch>,
    hydration: Mutex<Option<HydrationFuture>>,
}

impl HydrationCoordinator {
    pub fn new(provider: Arc<dyn SessionProvider>, store: Arc<AuthStore>) -> Arc<Self> {
        Self::with_options(provider, store, CoordinatorOptions::default())
    }

    pub fn with_options(
        provider: Arc<dyn SessionProvider>,
        store: Arc<AuthStore>,
        options: CoordinatorOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            store,
            options,
            latch: Mutex::new(Latch {
                machine: HydrationMachine::new(),
                source: None,
            }),
            hydration: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &Arc<AuthStore> {
        &self.store
    }

    /// Run hydration once and return the provider subscription.
    ///
    /// Safe to call any number of times from anywhere; only the first call
    /// subscribes and fetches. When a tokio runtime is available the shared
    /// future is also spawned, so hydration completes even if every caller
    /// stops waiting.
    pub async fn initialize(self: &Arc<Self>) -> SubscriptionHandle {
        let hydration = {
            let mut slot = self.hydration.lock();
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let fresh = Arc::clone(self).hydrate().boxed().shared();
                    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                        runtime.spawn(fresh.clone());
                    }
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        hydration.await
    }

    /// Current auth state.
    pub fn state(&self) -> AuthState {
        let latch = self.latch.lock();
        AuthState {
            user: self.store.user().get(),
            session: self.store.session().get(),
            loading: self.store.loading().get(),
            has_hydrated: *latch.machine.state() == HydrationState::Hydrated,
        }
    }

    pub fn is_hydrated(&self) -> bool {
        *self.latch.lock().machine.state() == HydrationState::Hydrated
    }

    /// Which input won the hydration race, once it has been decided.
    pub fn hydrated_by(&self) -> Option<HydrationSource> {
        self.latch.lock().source
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.session().get().is_some()
    }

    async fn hydrate(self: Arc<Self>) -> SubscriptionHandle {
        info!("Starting auth hydration");
        self.store.set_loading(true);

        // Subscribe before fetching: the provider may emit the initial event
        // from inside subscribe().
        let subscription = self.provider.subscribe(self.event_callback());
        debug!(subscription_id = %subscription.id(), "Subscribed to session events");

        match self.provider.fetch_current_session().await {
            Ok(session) => self.settle_from_fetch(session.map(Arc::new)),
            Err(e) => self.settle_from_fetch_failure(&e),
        }

        info!(
            hydrated_by = ?self.hydrated_by(),
            authenticated = self.is_authenticated(),
            "Auth hydration complete"
        );
        subscription
    }

    fn event_callback(self: &Arc<Self>) -> AuthEventCallback {
        let coordinator: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: AuthEvent| match coordinator.upgrade() {
            Some(coordinator) => coordinator.handle_event(event),
            None => warn!(kind = %event.kind, "Session event after coordinator was dropped"),
        })
    }

    fn handle_event(&self, event: AuthEvent) {
        self.trace_event(&event);

        let mut latch = self.latch.lock();
        if event.kind.is_initial() {
            if !Self::close_latch(&mut latch, HydrationSource::InitialEvent) {
                debug!("Ignoring initial session event, state already hydrated");
                return;
            }
            self.store.apply_session(event.session);
            self.store.set_loading(false);
        } else {
            self.store.apply_session(event.session);
        }
    }

    fn settle_from_fetch(&self, session: Option<Arc<Session>>) {
        let mut latch = self.latch.lock();
        if !Self::close_latch(&mut latch, HydrationSource::SessionFetch) {
            debug!(
                has_session = session.is_some(),
                "Session fetch result skipped, initial session event already received"
            );
            return;
        }
        self.store.apply_session(session);
        self.store.set_loading(false);
    }

    fn settle_from_fetch_failure(&self, err: &ProviderError) {
        error!(error = %err, transient = err.is_transient(), "Session fetch failed");

        let mut latch = self.latch.lock();
        if !Self::close_latch(&mut latch, HydrationSource::FetchFailure) {
            debug!("Session fetch failure ignored, state already hydrated");
            return;
        }
        self.store.apply_session(None);
        self.store.set_loading(false);
    }

    /// Try to move the latch to `Hydrated`. Returns false if it already was.
    fn close_latch(latch: &mut Latch, source: HydrationSource) -> bool {
        let input = HydrationInput::from(source);
        if latch.machine.consume(&input).is_err() {
            return false;
        }
        latch.source = Some(source);
        debug!(source = ?source, "Hydration latch closed");
        true
    }

    fn trace_event(&self, event: &AuthEvent) {
        let has_session = event.session.is_some();
        let user_id = event.user().map(|u| u.id.as_str());
        let expires_at = event
            .session
            .as_deref()
            .and_then(|s| s.expires_at)
            .map(|t| t.to_rfc3339());
        let expires_at = expires_at.as_deref();

        if self.options.verbose_auth_events {
            info!(kind = %event.kind, has_session, user_id, expires_at, "Auth event");
        } else {
            debug!(kind = %event.kind, has_session, user_id, expires_at, "Auth event");
        }
    }
}
