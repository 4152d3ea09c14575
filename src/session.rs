//! Session identity and the local authentication state machine.

use serde::{Deserialize, Serialize};

/// Authenticated identity as reported by the provider.
///
/// This mirrors the provider's session payload and contains no secrets;
/// the identity handle is opaque and owned by the provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Authentication state as known locally.
///
/// `Unknown` is held only until the first provider notification arrives;
/// after that the state is `Anonymous` or `Authenticated`, never `Unknown`
/// again, for the lifetime of the subscription.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    /// No provider notification has been observed yet.
    #[default]
    Unknown,
    /// The provider reported that no user is signed in.
    Anonymous,
    /// The provider reported a signed-in user.
    Authenticated(Session),
}

impl AuthState {
    /// Returns `true` until the first provider notification arrives.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The current session, if a user is signed in.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unknown | Self::Anonymous => None,
        }
    }
}

impl From<Option<Session>> for AuthState {
    /// A provider notification always resolves the loading state: the
    /// result is `Anonymous` or `Authenticated`, never `Unknown`.
    fn from(change: Option<Session>) -> Self {
        match change {
            Some(session) => Self::Authenticated(session),
            None => Self::Anonymous,
        }
    }
}
