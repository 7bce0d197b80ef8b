//! Scenario tests for auth hydration.
//!
//! Timing-sensitive scenarios run on a paused tokio clock, so "t=5ms" in a
//! test name is virtual time and the ordering is deterministic.

mod concurrency;
mod race;

use crate::{AuthStore, HydrationCoordinator, MemorySessionProvider, Session, User};
use std::sync::Arc;

pub(crate) fn session(user_id: &str) -> Session {
    Session::new(
        format!("access-{user_id}"),
        format!("refresh-{user_id}"),
        None,
        User::new(user_id, Some(format!("{user_id}@example.com"))),
    )
}

pub(crate) fn coordinator_for(provider: &Arc<MemorySessionProvider>) -> Arc<HydrationCoordinator> {
    HydrationCoordinator::new(provider.clone(), Arc::new(AuthStore::new()))
}

pub(crate) fn user_id(coordinator: &HydrationCoordinator) -> Option<String> {
    coordinator.state().user.map(|u| u.id)
}
