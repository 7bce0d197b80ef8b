//! `simulate` command: hydrate against a scripted provider.

use auth_hydration::{
    AuthEventKind, AuthState, CoordinatorOptions, HydrationSource, InitialEventMode,
    MemorySessionProvider, ProviderError, Session, SingletonRegistry, User,
};
use clap::Args;
use futures_util::future::join_all;
use hydration_config_and_utils::Config;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// User the one-shot fetch answers with (signed out if omitted)
    #[arg(long)]
    fetch_user: Option<String>,

    /// Fetch latency in milliseconds
    #[arg(long, default_value_t = 10)]
    fetch_delay_ms: u64,

    /// Make the fetch fail with this transport error message
    #[arg(long)]
    fail_fetch: Option<String>,

    /// User carried by the stream's initial-session event (signed out if omitted)
    #[arg(long)]
    initial_user: Option<String>,

    /// Initial-session event latency in milliseconds; 0 emits during subscribe
    #[arg(long, default_value_t = 5)]
    initial_delay_ms: u64,

    /// Never emit the initial-session event
    #[arg(long)]
    no_initial: bool,

    /// Number of concurrent initialize() callers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    callers: u16,

    /// Stop waiting for hydration after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Emit SIGNED_OUT once hydration completes
    #[arg(long)]
    sign_out_after: bool,
}

/// Outcome printed by the command.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub state: AuthState,
    pub hydrated_by: Option<HydrationSource>,
    pub timed_out: bool,
    pub subscription_id: Option<String>,
    pub distinct_handles: usize,
    pub subscriptions: usize,
    pub fetches: usize,
}

fn scripted_session(user_id: &str) -> Session {
    Session::new(
        format!("sim-access-{user_id}"),
        format!("sim-refresh-{user_id}"),
        None,
        User::new(user_id, None),
    )
}

fn build_provider(args: &SimulateArgs) -> MemorySessionProvider {
    let provider =
        MemorySessionProvider::with_session(args.initial_user.as_deref().map(scripted_session));
    provider.set_fetch_session(args.fetch_user.as_deref().map(scripted_session));
    provider.set_fetch_delay(Duration::from_millis(args.fetch_delay_ms));

    if let Some(message) = &args.fail_fetch {
        provider.fail_fetch(ProviderError::Transport(message.clone()));
    }

    let mode = if args.no_initial {
        InitialEventMode::Never
    } else if args.initial_delay_ms == 0 {
        InitialEventMode::Immediate
    } else {
        InitialEventMode::After(Duration::from_millis(args.initial_delay_ms))
    };
    provider.set_initial_event(mode);
    provider
}

/// Run one simulated hydration in `registry`.
///
/// Fails if the registry is already bound, since the scripted provider would
/// not be the one its runtime subscribes to.
pub async fn run(
    registry: &SingletonRegistry,
    config: &Config,
    args: SimulateArgs,
) -> anyhow::Result<SimulationReport> {
    let provider = Arc::new(build_provider(&args));
    let options = CoordinatorOptions {
        verbose_auth_events: config.verbose_auth_events,
    };

    let runtime = registry
        .try_bind(provider.clone(), options)
        .map_err(|_| anyhow::anyhow!("auth runtime is already bound in this process"))?;

    info!(callers = args.callers, "Starting simulated hydration");
    let callers = join_all((0..args.callers).map(|_| runtime.initialize()));

    let handles = match args.timeout_ms {
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), callers).await {
            Ok(handles) => Some(handles),
            Err(_) => {
                warn!(timeout_ms = ms, "Hydration did not finish before the timeout");
                None
            }
        },
        None => Some(callers.await),
    };

    if args.sign_out_after && handles.is_some() {
        provider.emit(AuthEventKind::SignedOut, None);
    }

    let distinct_handles = handles
        .as_ref()
        .map(|handles| handles.iter().map(|h| h.id()).collect::<HashSet<_>>().len())
        .unwrap_or(0);

    Ok(SimulationReport {
        state: runtime.coordinator.state(),
        hydrated_by: runtime.coordinator.hydrated_by(),
        timed_out: handles.is_none(),
        subscription_id: handles
            .as_ref()
            .and_then(|handles| handles.first())
            .map(|h| h.id().to_string()),
        distinct_handles,
        subscriptions: provider.subscribe_count(),
        fetches: provider.fetch_count(),
    })
}
