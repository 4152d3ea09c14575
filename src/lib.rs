//! # Ensaluto (Client-side Auth Session Context)
//!
//! `ensaluto` exposes sign-in, sign-up, sign-out and current-session state
//! to a host application, delegating all authentication to an external
//! identity provider. It is configuration and delegation glue: no wire
//! protocol, token handling or credential storage lives here.
//!
//! ## Session State
//!
//! [`AuthContext::mount`] registers a single listener with the provider.
//! The local state starts as [`AuthState::Unknown`] (loading) and is
//! replaced wholesale on every provider notification; after the first
//! notification it is `Anonymous` or `Authenticated`, never `Unknown`
//! again. Unmounting releases the subscription unconditionally.
//!
//! ## Facade Operations
//!
//! The three operations delegate to the provider and re-raise failures
//! unchanged after logging them. Success carries no session data: the
//! resulting state change arrives asynchronously through the
//! subscription, and callers must rely on [`AuthContext::watch`] rather
//! than inferring post-call state.
//!
//! ## Providers
//!
//! [`provider::HttpIdentityProvider`] speaks an identity service's JSON
//! auth API with cookie-backed sessions; [`provider::MockIdentityProvider`]
//! keeps accounts in memory for tests and local development. Both honor
//! the same contract: at least one notification after subscribing,
//! including "no session", delivered in order.

pub mod config;
pub mod context;
pub mod error;
pub mod provider;
pub mod session;
pub mod store;

pub use config::{ConfigError, ProviderConfig};
pub use context::AuthContext;
pub use error::Error;
pub use provider::{AuthChange, IdentityProvider, ProviderError, Subscription};
pub use session::{AuthState, Session};
pub use store::SessionStore;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
