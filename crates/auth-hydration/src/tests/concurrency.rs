//! Exactly-once hydration under repeated and concurrent `initialize()`.

use super::{coordinator_for, session};
use crate::{AuthEventKind, InitialEventMode, MemorySessionProvider};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn concurrent_initialize_subscribes_and_fetches_once() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("u1"))));
    provider.set_fetch_delay(Duration::from_millis(10));
    provider.set_initial_event(InitialEventMode::After(Duration::from_millis(5)));
    let coordinator = coordinator_for(&provider);

    let handles = join_all((0..16).map(|_| coordinator.initialize())).await;

    assert_eq!(provider.subscribe_count(), 1);
    assert_eq!(provider.fetch_count(), 1);
    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Two callers at t=0 and t=1ms share one subscription.
#[tokio::test(start_paused = true)]
async fn staggered_callers_share_the_subscription_handle() {
    let provider = Arc::new(MemorySessionProvider::new());
    provider.set_fetch_delay(Duration::from_millis(10));
    let coordinator = coordinator_for(&provider);

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.initialize().await }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;
    let second = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.initialize().await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.subscribe_count(), 1);
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn initialize_after_completion_returns_memoised_handle() {
    let provider = Arc::new(MemorySessionProvider::new());
    let coordinator = coordinator_for(&provider);

    let first = coordinator.initialize().await;
    let again = coordinator.initialize().await;

    assert_eq!(first, again);
    assert_eq!(provider.subscribe_count(), 1);
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_caller_does_not_restart_hydration() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("u1"))));
    provider.set_fetch_delay(Duration::from_millis(20));
    provider.set_initial_event(InitialEventMode::Never);
    let coordinator = coordinator_for(&provider);

    let timed_out =
        tokio::time::timeout(Duration::from_millis(5), coordinator.initialize()).await;
    assert!(timed_out.is_err());
    assert!(!coordinator.is_hydrated());

    // The spawned driver keeps going without any caller.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(coordinator.is_hydrated());

    coordinator.initialize().await;
    assert_eq!(provider.subscribe_count(), 1);
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(coordinator.state().user.map(|u| u.id).as_deref(), Some("u1"));
}

/// Parallel callers, emitters and readers on a multi-threaded runtime never
/// observe a torn snapshot.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_stay_consistent_across_worker_threads() {
    let provider = Arc::new(MemorySessionProvider::with_session(Some(session("u0"))));
    provider.set_fetch_delay(Duration::from_millis(2));
    provider.set_initial_event(InitialEventMode::After(Duration::from_millis(1)));
    let coordinator = coordinator_for(&provider);

    let reader = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            for _ in 0..2_000 {
                let state = coordinator.state();
                assert_eq!(state.user.is_some(), state.session.is_some());
                if !state.loading {
                    assert!(state.has_hydrated);
                }
                tokio::task::yield_now().await;
            }
        }
    });

    let emitters: Vec<_> = (0..4)
        .map(|n| {
            let provider = provider.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    if i % 2 == 0 {
                        let next = session(&format!("u{n}-{i}"));
                        provider.emit(AuthEventKind::SignedIn, Some(next));
                    } else {
                        provider.emit(AuthEventKind::SignedOut, None);
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let callers: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.initialize().await })
        })
        .collect();

    let mut handles = Vec::new();
    for caller in callers {
        handles.push(caller.await.unwrap());
    }
    for emitter in emitters {
        emitter.await.unwrap();
    }
    reader.await.unwrap();

    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(provider.subscribe_count(), 1);
    assert_eq!(provider.fetch_count(), 1);

    let state = coordinator.state();
    assert!(state.has_hydrated);
    assert!(!state.loading);
    assert_eq!(state.user.is_some(), state.session.is_some());
}
