//! Process-wide singleton slot for the auth store and coordinator.
//!
//! Code that is loaded more than once in a process (plugins, reloaded
//! modules, independent subsystems) must still share one store, one
//! coordinator and therefore one provider subscription. The registry holds a
//! single slot: the first request binds the runtime, every later request gets
//! the bound instance back. The slot is never torn down.

use crate::{AuthStore, CoordinatorOptions, HydrationCoordinator, SessionProvider, SubscriptionHandle};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// The store and coordinator bound into the slot.
#[derive(Clone)]
pub struct AuthRuntime {
    pub store: Arc<AuthStore>,
    pub coordinator: Arc<HydrationCoordinator>,
}

impl AuthRuntime {
    fn build(provider: Arc<dyn SessionProvider>, options: CoordinatorOptions) -> Self {
        let store = Arc::new(AuthStore::new());
        let coordinator = HydrationCoordinator::with_options(provider, store.clone(), options);
        Self { store, coordinator }
    }

    /// Shorthand for `self.coordinator.initialize()`.
    pub async fn initialize(&self) -> SubscriptionHandle {
        self.coordinator.initialize().await
    }
}

/// Single-slot registry.
#[derive(Default)]
pub struct SingletonRegistry {
    slot: Mutex<Option<AuthRuntime>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by the whole process.
    pub fn process() -> &'static SingletonRegistry {
        static REGISTRY: OnceLock<SingletonRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SingletonRegistry::new)
    }

    /// Return the bound runtime, binding one on first use.
    ///
    /// `make_provider` only runs when the slot is empty. It runs without the
    /// slot lock held, so it may use the registry itself; if another caller
    /// binds the slot meanwhile, the provider it built is dropped unused.
    pub fn get_or_create<F>(&self, make_provider: F) -> AuthRuntime
    where
        F: FnOnce() -> Arc<dyn SessionProvider>,
    {
        self.get_or_create_with_options(CoordinatorOptions::default(), make_provider)
    }

    /// Like [`get_or_create`](Self::get_or_create); `options` only apply when
    /// the slot is bound by this call.
    pub fn get_or_create_with_options<F>(
        &self,
        options: CoordinatorOptions,
        make_provider: F,
    ) -> AuthRuntime
    where
        F: FnOnce() -> Arc<dyn SessionProvider>,
    {
        if let Some(runtime) = self.get() {
            debug!("Reusing auth singleton");
            return runtime;
        }

        let provider = make_provider();
        match self.try_bind(provider, options) {
            Ok(runtime) => runtime,
            Err(existing) => {
                debug!("Auth singleton bound concurrently, dropping new provider");
                existing
            }
        }
    }

    /// Bind a runtime around `provider` if the slot is empty.
    ///
    /// Returns the already-bound runtime as the error otherwise; `provider`
    /// is never subscribed in that case.
    pub fn try_bind(
        &self,
        provider: Arc<dyn SessionProvider>,
        options: CoordinatorOptions,
    ) -> Result<AuthRuntime, AuthRuntime> {
        let mut slot = self.slot.lock();
        if let Some(existing) = slot.as_ref() {
            return Err(existing.clone());
        }

        info!("Creating auth singleton");
        let runtime = AuthRuntime::build(provider, options);
        *slot = Some(runtime.clone());
        Ok(runtime)
    }

    /// The bound runtime, if any.
    pub fn get(&self) -> Option<AuthRuntime> {
        self.slot.lock().clone()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Process-wide runtime, bound on first use.
pub fn get_or_create<F>(make_provider: F) -> AuthRuntime
where
    F: FnOnce() -> Arc<dyn SessionProvider>,
{
    SingletonRegistry::process().get_or_create(make_provider)
}
