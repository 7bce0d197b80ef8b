//! Initial-event vs. one-shot fetch race.

use super::{coordinator_for, session, user_id};
use crate::{HydrationSource, InitialEventMode, MemorySessionProvider};
use std::sync::Arc;
use std::time::Duration;

/// Stream emits INITIAL(S2) at t=5ms, fetch resolves S1 at t=10ms.
#[tokio::test(start_paused = true)]
async fn initial_event_first_wins_and_fetch_is_noop() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("s2"))));
    provider.set_fetch_session(Some(session("s1")));
    provider.set_fetch_delay(Duration::from_millis(10));
    provider.set_initial_event(InitialEventMode::After(Duration::from_millis(5)));
    let coordinator = coordinator_for(&provider);

    let init = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.initialize().await }
    });

    tokio::time::sleep(Duration::from_millis(6)).await;
    let state = coordinator.state();
    assert!(state.has_hydrated, "stream should have hydrated by t=6ms");
    assert!(!state.loading);
    assert_eq!(user_id(&coordinator).as_deref(), Some("s2"));

    init.await.unwrap();

    assert_eq!(user_id(&coordinator).as_deref(), Some("s2"));
    assert_eq!(coordinator.hydrated_by(), Some(HydrationSource::InitialEvent));
    assert_eq!(provider.fetch_count(), 1);
}

/// Fetch resolves S1 at t=5ms, stream emits a late INITIAL(S2) at t=10ms.
#[tokio::test(start_paused = true)]
async fn fetch_first_wins_and_late_initial_event_is_discarded() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("s2"))));
    provider.set_fetch_session(Some(session("s1")));
    provider.set_fetch_delay(Duration::from_millis(5));
    provider.set_initial_event(InitialEventMode::After(Duration::from_millis(10)));
    let coordinator = coordinator_for(&provider);

    coordinator.initialize().await;
    assert_eq!(user_id(&coordinator).as_deref(), Some("s1"));
    assert_eq!(coordinator.hydrated_by(), Some(HydrationSource::SessionFetch));

    tokio::time::sleep(Duration::from_millis(10)).await;

    let state = coordinator.state();
    assert_eq!(user_id(&coordinator).as_deref(), Some("s1"));
    assert!(state.has_hydrated);
    assert!(!state.loading);
    assert_eq!(coordinator.hydrated_by(), Some(HydrationSource::SessionFetch));
}

#[tokio::test]
async fn synchronous_initial_event_during_subscribe_is_not_missed() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("s2"))));
    provider.set_fetch_session(None);
    provider.set_initial_event(InitialEventMode::Immediate);
    let coordinator = coordinator_for(&provider);

    coordinator.initialize().await;

    assert_eq!(coordinator.hydrated_by(), Some(HydrationSource::InitialEvent));
    assert_eq!(user_id(&coordinator).as_deref(), Some("s2"));
}

#[tokio::test]
async fn signed_out_initial_event_hydrates_as_signed_out() {
    let provider = Arc::new(MemorySessionProvider::new());
    provider.set_fetch_session(Some(session("stale")));
    let coordinator = coordinator_for(&provider);

    coordinator.initialize().await;

    let state = coordinator.state();
    assert!(state.session.is_none());
    assert!(state.user.is_none());
    assert!(state.has_hydrated);
    assert!(!state.loading);
}

#[tokio::test(start_paused = true)]
async fn fetch_hydrates_when_stream_never_sends_initial_event() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("s1"))));
    provider.set_fetch_delay(Duration::from_millis(3));
    provider.set_initial_event(InitialEventMode::Never);
    let coordinator = coordinator_for(&provider);

    coordinator.initialize().await;

    assert_eq!(user_id(&coordinator).as_deref(), Some("s1"));
    assert_eq!(coordinator.hydrated_by(), Some(HydrationSource::SessionFetch));
    assert!(!coordinator.state().loading);
}

#[tokio::test(start_paused = true)]
async fn loading_only_clears_once_hydrated() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("s1"))));
    provider.set_fetch_delay(Duration::from_millis(10));
    provider.set_initial_event(InitialEventMode::After(Duration::from_millis(5)));
    let coordinator = coordinator_for(&provider);
    let mut loading = coordinator.store().loading().subscribe();

    let init = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.initialize().await }
    });

    assert_eq!(loading.next().await, Some(true));
    assert_eq!(loading.next().await, Some(false));
    assert!(coordinator.is_hydrated());

    init.await.unwrap();
    assert!(loading.try_next().is_none(), "loading must not flip again");
}
