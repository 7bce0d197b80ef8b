//! Hydration latch as an explicit state machine.
//!
//! ```text
//! ┌─────────────────┐
//! │    Hydrating    │ (initial)
//! └────────┬────────┘
//!          │ InitialSessionEvent / SessionFetched / SessionFetchFailed
//!          ▼
//! ┌─────────────────┐
//! │    Hydrated     │ (terminal, every hydration input is rejected)
//! └─────────────────┘
//! ```
//!
//! The first hydration input wins. The loser's input is an impossible
//! transition, which the coordinator treats as "discard".

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub hydration_machine(Hydrating)

    Hydrating => {
        InitialSessionEvent => Hydrated,
        SessionFetched => Hydrated,
        SessionFetchFailed => Hydrated
    }
}

pub use hydration_machine::Input as HydrationInput;
pub use hydration_machine::State as HydrationState;
pub use hydration_machine::StateMachine as HydrationMachine;

/// Which input closed the hydration latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationSource {
    /// The stream's initial-session event arrived first.
    InitialEvent,
    /// The one-shot session fetch resolved first.
    SessionFetch,
    /// The one-shot fetch failed before the stream hydrated.
    FetchFailure,
}

impl From<HydrationSource> for HydrationInput {
    fn from(source: HydrationSource) -> Self {
        match source {
            HydrationSource::InitialEvent => HydrationInput::InitialSessionEvent,
            HydrationSource::SessionFetch => HydrationInput::SessionFetched,
            HydrationSource::FetchFailure => HydrationInput::SessionFetchFailed,
        }
    }
}
