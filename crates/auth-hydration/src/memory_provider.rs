//! Scripted in-memory session provider.
//!
//! Stands in for the hosted identity backend in tests, in the `auth-hydrate`
//! CLI, and in embedders that want deterministic provider timing. Fetch
//! latency, fetch failure and the timing of the initial-session event are all
//! configurable, and later events can be pushed with [`MemorySessionProvider::emit`].

use crate::{
    AuthEvent, AuthEventCallback, AuthEventKind, ProviderError, Session, SessionFuture,
    SessionProvider, SubscriptionHandle,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// When a new subscription receives its initial-session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialEventMode {
    /// Delivered synchronously, before `subscribe` returns.
    Immediate,
    /// Delivered from a spawned task after the delay.
    After(Duration),
    /// Never delivered.
    Never,
}

/// What the one-shot fetch answers.
#[derive(Debug, Clone)]
enum FetchPlan {
    /// The provider's current session at the time the fetch completes.
    Current,
    /// A fixed answer, independent of the current session.
    Fixed(Option<Arc<Session>>),
    Fail(ProviderError),
}

struct ProviderState {
    current: Option<Arc<Session>>,
    listeners: Vec<(Uuid, AuthEventCallback)>,
    fetch_delay: Duration,
    fetch_plan: FetchPlan,
    initial_event: InitialEventMode,
}

struct ProviderCore {
    state: Mutex<ProviderState>,
    fetches: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl ProviderCore {
    fn listener(&self, id: Uuid) -> Option<AuthEventCallback> {
        self.state
            .lock()
            .listeners
            .iter()
            .find(|(listener_id, _)| *listener_id == id)
            .map(|(_, callback)| callback.clone())
    }
}

/// In-memory [`SessionProvider`].
pub struct MemorySessionProvider {
    core: Arc<ProviderCore>,
}

impl MemorySessionProvider {
    /// Signed-out provider that answers fetches immediately and emits the
    /// initial event synchronously on subscribe.
    pub fn new() -> Self {
        Self::with_session(None)
    }

    pub fn with_session(session: Option<Session>) -> Self {
        Self {
            core: Arc::new(ProviderCore {
                state: Mutex::new(ProviderState {
                    current: session.map(Arc::new),
                    listeners: Vec::new(),
                    fetch_delay: Duration::ZERO,
                    fetch_plan: FetchPlan::Current,
                    initial_event: InitialEventMode::Immediate,
                }),
                fetches: AtomicUsize::new(0),
                subscriptions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.core.state.lock().fetch_delay = delay;
    }

    /// Make fetches fail with `err`.
    pub fn fail_fetch(&self, err: ProviderError) {
        self.core.state.lock().fetch_plan = FetchPlan::Fail(err);
    }

    /// Make fetches answer `session` regardless of the current session.
    pub fn set_fetch_session(&self, session: Option<Session>) {
        self.core.state.lock().fetch_plan = FetchPlan::Fixed(session.map(Arc::new));
    }

    /// Make fetches answer the current session again.
    pub fn fetch_current(&self) {
        self.core.state.lock().fetch_plan = FetchPlan::Current;
    }

    pub fn set_initial_event(&self, mode: InitialEventMode) {
        self.core.state.lock().initial_event = mode;
    }

    /// Replace the current session without notifying listeners.
    pub fn set_current_session(&self, session: Option<Session>) {
        self.core.state.lock().current = session.map(Arc::new);
    }

    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.core.state.lock().current.clone()
    }

    /// Replace the current session and deliver `kind` to every listener, in
    /// subscription order.
    pub fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        let session = session.map(Arc::new);
        let listeners: Vec<AuthEventCallback> = {
            let mut state = self.core.state.lock();
            state.current = session.clone();
            state.listeners.iter().map(|(_, cb)| cb.clone()).collect()
        };

        debug!(kind = %kind, listeners = listeners.len(), "Emitting session event");
        for listener in listeners {
            listener(AuthEvent::new(kind.clone(), session.clone()));
        }
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.core.fetches.load(Ordering::SeqCst)
    }

    /// Number of subscriptions ever created.
    pub fn subscribe_count(&self) -> usize {
        self.core.subscriptions.load(Ordering::SeqCst)
    }

    /// Number of subscriptions not yet unsubscribed.
    pub fn active_subscriptions(&self) -> usize {
        self.core.state.lock().listeners.len()
    }

    fn deliver_initial(core: &ProviderCore, id: Uuid) {
        let Some(listener) = core.listener(id) else {
            return;
        };
        let session = core.state.lock().current.clone();
        debug!(subscription_id = %id, has_session = session.is_some(), "Emitting initial session");
        listener(AuthEvent::new(AuthEventKind::Initial, session));
    }
}

impl Default for MemorySessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for MemorySessionProvider {
    fn fetch_current_session(&self) -> SessionFuture<'_> {
        self.core.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.core.state.lock().fetch_delay;

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let state = self.core.state.lock();
            match &state.fetch_plan {
                FetchPlan::Current => Ok(state.current.as_deref().cloned()),
                FetchPlan::Fixed(session) => Ok(session.as_deref().cloned()),
                FetchPlan::Fail(err) => Err(err.clone()),
            }
        })
    }

    fn subscribe(&self, on_event: AuthEventCallback) -> SubscriptionHandle {
        let id = Uuid::new_v4();
        self.core.subscriptions.fetch_add(1, Ordering::SeqCst);

        let mode = {
            let mut state = self.core.state.lock();
            state.listeners.push((id, on_event));
            state.initial_event
        };

        match mode {
            InitialEventMode::Immediate => Self::deliver_initial(&self.core, id),
            InitialEventMode::After(delay) => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let core = Arc::clone(&self.core);
                    runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        Self::deliver_initial(&core, id);
                    });
                }
                Err(_) => warn!("No async runtime, initial session event will not be delivered"),
            },
            InitialEventMode::Never => {}
        }

        let core = Arc::downgrade(&self.core);
        SubscriptionHandle::new(id, move || {
            if let Some(core) = core.upgrade() {
                core.state.lock().listeners.retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }
}
