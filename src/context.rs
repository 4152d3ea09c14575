//! Auth context: the facade handed down the host application's
//! composition tree. Operations delegate to the identity provider and
//! never write local state; the store's subscription is the only writer.

use crate::{
    error::Error,
    provider::IdentityProvider,
    session::{AuthState, Session},
    store::SessionStore,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

/// Shared authentication context.
///
/// Cheap to clone; all clones observe the same state. Mounted once at the
/// application's root scope and passed down instead of being a true
/// global. The provider subscription is released on [`unmount`] or when
/// the last clone drops.
///
/// [`unmount`]: AuthContext::unmount
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
}

impl AuthContext {
    /// Mounts the context: subscribes the session store to the provider.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn mount(provider: Arc<dyn IdentityProvider>) -> Self {
        let store = SessionStore::mount(provider.as_ref());
        Self {
            inner: Arc::new(ContextInner { provider, store }),
        }
    }

    /// Signs in with email and password.
    ///
    /// Success carries no session data: the state change arrives through
    /// the store's subscription, and callers must not assume it has been
    /// observed by the time this returns.
    ///
    /// # Errors
    /// Returns an error on empty credentials or when the provider fails;
    /// provider failures are logged and re-raised unchanged.
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        validate_credentials(email, password)?;
        if let Err(err) = self.inner.provider.sign_in(email, password).await {
            error!("Failed to sign in: {err}");
            return Err(Error::Provider(err));
        }
        Ok(())
    }

    /// Creates an account with email and password.
    ///
    /// Same asynchronous-notification contract as [`sign_in`].
    ///
    /// [`sign_in`]: AuthContext::sign_in
    ///
    /// # Errors
    /// Returns an error on empty credentials or when the provider fails.
    pub async fn sign_up(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        validate_credentials(email, password)?;
        if let Err(err) = self.inner.provider.sign_up(email, password).await {
            error!("Failed to sign up: {err}");
            return Err(Error::Provider(err));
        }
        Ok(())
    }

    /// Signs the current user out.
    ///
    /// # Errors
    /// Returns an error when the provider fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        if let Err(err) = self.inner.provider.sign_out().await {
            error!("Failed to sign out: {err}");
            return Err(Error::Provider(err));
        }
        Ok(())
    }

    /// Snapshot of the current authentication state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.store.state()
    }

    /// The current session, if a user is signed in.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.inner.store.session()
    }

    /// `true` until the first provider notification arrives.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.store.is_loading()
    }

    /// A receiver to await authentication state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.inner.store.watch()
    }

    /// Releases the provider subscription.
    ///
    /// Clones of this context stay readable but observe no further
    /// updates. Dropping the last clone has the same effect.
    pub fn unmount(&self) {
        self.inner.store.unmount();
    }
}

fn validate_credentials(email: &str, password: &SecretString) -> Result<(), Error> {
    if email.trim().is_empty() || password.expose_secret().trim().is_empty() {
        return Err(Error::EmptyCredentials);
    }
    Ok(())
}
