//! Observable auth state store.
//!
//! Holds the three process-wide values UI code watches: the current user, the
//! current session and the loading flag. Each value fans out to its watchers
//! through per-watcher unbounded channels, so a slow watcher never delays the
//! others. Only the hydration coordinator writes to the store.

use crate::{Session, User};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A value that notifies watchers on every change.
pub struct Observable<T> {
    inner: Mutex<ObservableInner<T>>,
}

struct ObservableInner<T> {
    value: T,
    watchers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(ObservableInner {
                value,
                watchers: Vec::new(),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.lock().value.clone()
    }

    /// Start watching. The watcher yields the current value first, then every
    /// later change in the order it was applied.
    pub fn subscribe(&self) -> Watcher<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // Receiver is alive, the send cannot fail.
        let _ = tx.send(inner.value.clone());
        inner.watchers.push(tx);
        Watcher { rx }
    }

    /// Replace the value. Returns false (and notifies nobody) if unchanged.
    pub(crate) fn set(&self, value: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.value == value {
            return false;
        }
        inner.value = value;
        let ObservableInner { value, watchers } = &mut *inner;
        watchers.retain(|tx| tx.send(value.clone()).is_ok());
        true
    }
}

/// Receiving end of an [`Observable`] subscription.
pub struct Watcher<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Watcher<T> {
    /// Wait for the next value. Returns `None` once the observable is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next value if one is already queued.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued value.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }
}

/// The auth values shared with the rest of the application.
pub struct AuthStore {
    user: Observable<Option<User>>,
    session: Observable<Option<Arc<Session>>>,
    loading: Observable<bool>,
}

impl AuthStore {
    /// Fresh store: signed out, loading.
    pub fn new() -> Self {
        Self {
            user: Observable::new(None),
            session: Observable::new(None),
            loading: Observable::new(true),
        }
    }

    pub fn user(&self) -> &Observable<Option<User>> {
        &self.user
    }

    pub fn session(&self) -> &Observable<Option<Arc<Session>>> {
        &self.session
    }

    pub fn loading(&self) -> &Observable<bool> {
        &self.loading
    }

    /// Replace the session and its derived user together.
    pub(crate) fn apply_session(&self, session: Option<Arc<Session>>) {
        let user = session.as_ref().map(|s| s.user.clone());
        self.session.set(session);
        self.user.set(user);
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.set(loading);
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}
