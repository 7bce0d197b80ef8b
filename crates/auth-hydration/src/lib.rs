//! Authentication session hydration for the FlowTrials app.
//!
//! This crate provides:
//! - An observable auth store (current user, current session, loading flag)
//! - A hydration coordinator that settles the first authoritative auth state
//!   from two racing provider inputs: the initial-session event and the
//!   one-shot session fetch
//! - An explicit FSM-based hydration latch
//! - A process-wide singleton slot so the store and the provider
//!   subscription exist once per process
//! - A scripted in-memory session provider

mod coordinator;
mod error;
pub mod hydration_fsm;
mod memory_provider;
mod provider;
mod registry;
mod session;
mod store;

#[cfg(test)]
mod tests;

pub use coordinator::{AuthState, CoordinatorOptions, HydrationCoordinator};
pub use error::{ProviderError, ProviderResult};
pub use hydration_fsm::HydrationSource;
pub use memory_provider::{InitialEventMode, MemorySessionProvider};
pub use provider::{AuthEventCallback, SessionFuture, SessionProvider, SubscriptionHandle};
pub use registry::{get_or_create, AuthRuntime, SingletonRegistry};
pub use session::{AuthEvent, AuthEventKind, Session, User};
pub use store::{AuthStore, Observable, Watcher};
