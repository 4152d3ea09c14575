//! Identity provider seam. The auth context delegates sign-in, sign-up
//! and sign-out to an implementation of [`IdentityProvider`] and observes
//! state through its subscription; local state is never written by the
//! operations themselves.

pub mod http;
pub mod mock;

pub use http::HttpIdentityProvider;
pub use mock::MockIdentityProvider;

use crate::session::Session;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// A state-change notification from the provider: the current session,
/// or `None` when no user is signed in.
pub type AuthChange = Option<Session>;

/// Errors reported by the external identity service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport-level failure reaching the provider.
    #[error("unable to reach the identity provider: {0}")]
    Network(String),

    /// The provider rejected the presented credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for the presented email.
    #[error("account already exists")]
    AlreadyExists,

    /// Non-success HTTP status from the provider.
    #[error("provider request failed ({status}): {message}")]
    Http { status: u16, message: String },

    /// The provider response could not be decoded.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

/// External identity service.
///
/// Implementations perform the actual authentication and own session
/// persistence and token handling. A successful operation carries no
/// state in its return value; the resulting state change is delivered
/// through the subscription.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate an existing account.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ProviderError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<(), ProviderError>;

    /// Clear the provider-side session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Register a state-change listener.
    ///
    /// The provider delivers at least one notification after registration,
    /// including "no session", and serializes its notifications.
    fn subscribe(&self) -> Subscription;
}

/// One listener registration: an event stream plus its unsubscribe handle.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<AuthChange>,
    guard: SubscriptionGuard,
}

impl Subscription {
    /// Next notification, or `None` once the provider is gone.
    pub async fn next(&mut self) -> Option<AuthChange> {
        self.events.recv().await
    }

    /// Remove the listener from the provider. Equivalent to dropping the
    /// subscription; buffered notifications are discarded.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Splits the subscription so the event stream can be consumed by a
    /// task while the guard stays with the owning scope.
    pub(crate) fn into_parts(self) -> (mpsc::UnboundedReceiver<AuthChange>, SubscriptionGuard) {
        (self.events, self.guard)
    }

    /// Registry id of this listener.
    pub(crate) fn id(&self) -> u64 {
        self.guard.id
    }
}

/// Unregisters the listener when dropped.
pub(crate) struct SubscriptionGuard {
    id: u64,
    listeners: Arc<Listeners>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.listeners.remove(self.id);
    }
}

/// Listener registry shared by provider implementations.
///
/// Senders are kept in registration order; per-listener delivery order is
/// the order of `emit` calls. Closed receivers are pruned on emit.
#[derive(Default)]
pub(crate) struct Listeners {
    inner: Mutex<ListenerTable>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    senders: BTreeMap<u64, mpsc::UnboundedSender<AuthChange>>,
}

impl Listeners {
    /// Registers a listener and returns its subscription.
    pub(crate) fn register(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let Ok(mut table) = self.inner.lock() else {
                // A poisoned registry means a listener panicked mid-emit;
                // hand back a subscription that never fires.
                return Subscription {
                    events: rx,
                    guard: SubscriptionGuard {
                        id: u64::MAX,
                        listeners: Arc::clone(self),
                    },
                };
            };
            let id = table.next_id;
            table.next_id += 1;
            table.senders.insert(id, tx);
            id
        };
        debug!("Registered auth state listener {id}");
        Subscription {
            events: rx,
            guard: SubscriptionGuard {
                id,
                listeners: Arc::clone(self),
            },
        }
    }

    /// Delivers a notification to every registered listener.
    pub(crate) fn emit(&self, change: &AuthChange) {
        let Ok(mut table) = self.inner.lock() else {
            return;
        };
        table
            .senders
            .retain(|_, sender| sender.send(change.clone()).is_ok());
    }

    /// Delivers a notification to a single listener, if still registered.
    pub(crate) fn emit_to(&self, id: u64, change: AuthChange) {
        let Ok(table) = self.inner.lock() else {
            return;
        };
        if let Some(sender) = table.senders.get(&id) {
            let _ = sender.send(change);
        }
    }

    fn remove(&self, id: u64) {
        let Ok(mut table) = self.inner.lock() else {
            return;
        };
        if table.senders.remove(&id).is_some() {
            debug!("Unregistered auth state listener {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(email: &str) -> Session {
        Session {
            user_id: format!("u-{email}"),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn emit_reaches_all_listeners_in_order() {
        let listeners = Arc::new(Listeners::default());
        let mut first = listeners.register();
        let mut second = listeners.register();

        listeners.emit(&None);
        listeners.emit(&Some(session("a@x.com")));

        assert_eq!(first.next().await, Some(None));
        assert_eq!(first.next().await, Some(Some(session("a@x.com"))));
        assert_eq!(second.next().await, Some(None));
        assert_eq!(second.next().await, Some(Some(session("a@x.com"))));
    }

    #[tokio::test]
    async fn unsubscribe_removes_the_listener() {
        let listeners = Arc::new(Listeners::default());
        let subscription = listeners.register();
        let mut kept = listeners.register();

        subscription.unsubscribe();
        listeners.emit(&None);

        assert_eq!(kept.next().await, Some(None));
        let table = listeners.inner.lock().expect("registry lock");
        assert_eq!(table.senders.len(), 1);
    }

    #[tokio::test]
    async fn emit_to_targets_one_listener() {
        let listeners = Arc::new(Listeners::default());
        let mut first = listeners.register();
        let mut second = listeners.register();

        listeners.emit_to(second.id(), Some(session("b@x.com")));
        listeners.emit(&None);

        // The targeted notification reaches only the second listener.
        assert_eq!(first.next().await, Some(None));
        assert_eq!(second.next().await, Some(Some(session("b@x.com"))));
        assert_eq!(second.next().await, Some(None));
    }
}
