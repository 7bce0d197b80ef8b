//! Session, user and auth event types.
//!
//! A `Session` is an opaque artifact handed out by the identity backend. The
//! coordinator never edits one; a change always arrives as a new session that
//! replaces the previous value wholesale, so sessions travel as `Arc<Session>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity record of an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

/// Credentials and expiry for an authenticated principal.
///
/// Token material is skipped when serialising and redacted from `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(skip_serializing, default)]
    pub access_token: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        user: User,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            user,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Kind of a session-change event emitted by the provider's stream.
///
/// `Initial` is the distinguished per-subscription "initial state" signal; it
/// is emitted at most once per subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuthEventKind {
    Initial,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    Other(String),
}

impl AuthEventKind {
    /// Wire name used by the identity backend.
    pub fn as_str(&self) -> &str {
        match self {
            AuthEventKind::Initial => "INITIAL_SESSION",
            AuthEventKind::SignedIn => "SIGNED_IN",
            AuthEventKind::SignedOut => "SIGNED_OUT",
            AuthEventKind::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEventKind::UserUpdated => "USER_UPDATED",
            AuthEventKind::Other(name) => name,
        }
    }

    /// Parse a wire name. Unknown names are kept verbatim as `Other`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "INITIAL_SESSION" => AuthEventKind::Initial,
            "SIGNED_IN" => AuthEventKind::SignedIn,
            "SIGNED_OUT" => AuthEventKind::SignedOut,
            "TOKEN_REFRESHED" => AuthEventKind::TokenRefreshed,
            "USER_UPDATED" => AuthEventKind::UserUpdated,
            other => AuthEventKind::Other(other.to_string()),
        }
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, AuthEventKind::Initial)
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AuthEventKind> for String {
    fn from(kind: AuthEventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl From<String> for AuthEventKind {
    fn from(name: String) -> Self {
        AuthEventKind::from_wire(&name)
    }
}

/// A session-change event delivered by the provider's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Arc<Session>>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Arc<Session>>) -> Self {
        Self { kind, session }
    }

    /// User carried by the event's session, if any.
    pub fn user(&self) -> Option<&User> {
        self.session.as_deref().map(|session| &session.user)
    }
}
