//! Session provider interface.
//!
//! The provider is the external identity backend. It offers a one-shot
//! "current session" query and a long-lived stream of session-change events.
//! Nothing orders the two relative to each other.

use crate::{AuthEvent, ProviderResult, Session};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// Future returned by [`SessionProvider::fetch_current_session`].
pub type SessionFuture<'a> =
    Pin<Box<dyn Future<Output = ProviderResult<Option<Session>>> + Send + 'a>>;

/// Callback invoked for every event on a provider subscription.
///
/// Providers may invoke it synchronously from inside `subscribe`.
pub type AuthEventCallback = Arc<dyn Fn(AuthEvent) + Send + Sync>;

/// External identity backend consumed by the hydration coordinator.
pub trait SessionProvider: Send + Sync {
    /// Query the current session once.
    fn fetch_current_session(&self) -> SessionFuture<'_>;

    /// Register a session-change listener.
    ///
    /// The provider emits `AuthEventKind::Initial` at most once per
    /// subscription, possibly before this method returns.
    fn subscribe(&self, on_event: AuthEventCallback) -> SubscriptionHandle;
}

/// Handle to a live provider subscription.
///
/// Clones refer to the same subscription and compare equal.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: Uuid,
    unsubscribe: Arc<dyn Fn() + Send + Sync>,
}

impl SubscriptionHandle {
    pub fn new(id: Uuid, unsubscribe: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unsubscribe: Arc::new(unsubscribe),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the provider to stop delivering events to this subscription.
    pub fn unsubscribe(&self) {
        (self.unsubscribe)();
    }
}

impl PartialEq for SubscriptionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriptionHandle {}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
