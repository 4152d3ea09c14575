//! In-memory identity provider for tests and host-application development.
//! Implements the same notification contract as the HTTP provider and
//! additionally lets callers emit provider-initiated changes, e.g. a
//! session expiring as seen by the provider.

use crate::{
    provider::{AuthChange, IdentityProvider, Listeners, ProviderError, Subscription},
    session::Session,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct MockAccount {
    user_id: String,
    password: String,
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, MockAccount>,
    session: AuthChange,
    next_user: u64,
}

/// Identity provider holding accounts and the current session in memory.
#[derive(Default)]
pub struct MockIdentityProvider {
    state: Mutex<MockState>,
    listeners: Arc<Listeners>,
}

impl MockIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-registers an account.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let user_id = format!("user-{}", state.next_user);
            state.next_user += 1;
            state.accounts.insert(
                email.to_string(),
                MockAccount {
                    user_id,
                    password: password.to_string(),
                },
            );
        }
        self
    }

    /// Emits a provider-initiated state change to all listeners.
    pub fn emit(&self, change: AuthChange) {
        if let Ok(mut state) = self.state.lock() {
            state.session = change.clone();
        }
        self.listeners.emit(&change);
    }

    /// Current provider-side session.
    #[must_use]
    pub fn current_session(&self) -> AuthChange {
        self.state
            .lock()
            .map(|state| state.session.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        let session = {
            let state = self
                .state
                .lock()
                .map_err(|_| ProviderError::Network("provider state poisoned".to_string()))?;
            match state.accounts.get(email) {
                Some(account) if account.password == password.expose_secret() => Session {
                    user_id: account.user_id.clone(),
                    email: email.to_string(),
                },
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };
        self.emit(Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<(), ProviderError> {
        let session = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| ProviderError::Network("provider state poisoned".to_string()))?;
            if state.accounts.contains_key(email) {
                return Err(ProviderError::AlreadyExists);
            }
            let user_id = format!("user-{}", state.next_user);
            state.next_user += 1;
            state.accounts.insert(
                email.to_string(),
                MockAccount {
                    user_id: user_id.clone(),
                    password: password.expose_secret().to_string(),
                },
            );
            Session {
                user_id,
                email: email.to_string(),
            }
        };
        self.emit(Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.emit(None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        let subscription = self.listeners.register();
        // Initial resolution is immediate: the current in-memory session.
        self.listeners
            .emit_to(subscription.id(), self.current_session());
        subscription
    }
}
