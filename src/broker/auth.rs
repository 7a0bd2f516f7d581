//! Auth gate
//!
//! A stateless policy over the configured credentials. It answers two
//! questions: does an `auth` payload match, and may a session with a given
//! authentication state subscribe or publish.
//!
//! When authentication is disabled every session is treated as authenticated.
//! When it is enabled, requests from unauthenticated sessions are dropped
//! without any reply.

use crate::config::AuthSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failed,
}

impl AuthOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, AuthOutcome::Success)
    }
}

#[derive(Clone)]
pub struct AuthGate {
    enabled: bool,
    // "username:password", the exact form clients send.
    credentials: String,
}

impl AuthGate {
    pub fn new(enabled: bool, username: &str, password: &str) -> Self {
        Self {
            enabled,
            credentials: format!("{username}:{password}"),
        }
    }

    /// A gate that lets every session through.
    pub fn disabled() -> Self {
        Self::new(false, "", "")
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.enabled, &settings.username, &settings.password)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compare an `auth` payload against the configured `username:password`.
    ///
    /// A disabled gate has no credentials to match, so every attempt fails.
    pub fn authenticate(&self, payload: &str) -> AuthOutcome {
        if self.enabled && payload == self.credentials {
            AuthOutcome::Success
        } else {
            AuthOutcome::Failed
        }
    }

    /// Whether a subscribe or publish from a session in this state takes effect.
    pub fn permits(&self, authenticated: bool) -> bool {
        !self.enabled || authenticated
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("enabled", &self.enabled)
            .field("credentials", &"<redacted>")
            .finish()
    }
}
