//! Session provider error types.

use thiserror::Error;

/// Failure reported by the session provider's one-shot session query.
///
/// The coordinator never propagates these to `initialize()` callers; a failed
/// fetch settles hydration as signed out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or transport failure while talking to the identity backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// The identity backend refused the stored credentials
    #[error("Session rejected: {0}")]
    Rejected(String),

    /// The identity backend is not reachable at all
    #[error("Session provider unavailable")]
    Unavailable,
}

impl ProviderError {
    /// Returns true if a later fetch could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Unavailable => true,
            ProviderError::Rejected(_) => false,
        }
    }
}

/// Result type alias using ProviderError.
pub type ProviderResult<T> = Result<T, ProviderError>;
