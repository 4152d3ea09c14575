//! Reactive session store. Subscribes once to the identity provider and
//! republishes its notifications over a `watch` channel; nothing else
//! ever writes the state.

use crate::{
    provider::{IdentityProvider, SubscriptionGuard},
    session::{AuthState, Session},
};
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

struct Mounted {
    listener: JoinHandle<()>,
    _guard: SubscriptionGuard,
}

/// Holds the current [`AuthState`], fed exclusively by provider
/// notifications. Starts in the loading state and leaves it on the first
/// notification, permanently.
pub struct SessionStore {
    state: watch::Receiver<AuthState>,
    mounted: Mutex<Option<Mounted>>,
}

impl SessionStore {
    /// Subscribes to the provider and starts the listener task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn mount(provider: &dyn IdentityProvider) -> Self {
        let (tx, rx) = watch::channel(AuthState::Unknown);
        let (mut events, guard) = provider.subscribe().into_parts();

        let listener = tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                // Wholesale replacement; the first one clears loading.
                tx.send_replace(AuthState::from(change));
            }
            debug!("Provider notification channel closed");
        });

        Self {
            state: rx,
            mounted: Mutex::new(Some(Mounted {
                listener,
                _guard: guard,
            })),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The current session, if a user is signed in.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// `true` until the first provider notification arrives.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// A receiver to observe state changes; the last published state
    /// stays readable after unmount.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    /// Unregisters the provider listener and stops the listener task.
    ///
    /// Idempotent; also runs on drop. No state mutation can occur
    /// afterwards, regardless of what the provider emits.
    pub fn unmount(&self) {
        let Ok(mut slot) = self.mounted.lock() else {
            return;
        };
        if let Some(mounted) = slot.take() {
            mounted.listener.abort();
            debug!("Session store unmounted");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockIdentityProvider;
    use std::time::Duration;

    async fn wait_until(
        store: &SessionStore,
        predicate: impl Fn(&AuthState) -> bool,
    ) -> AuthState {
        let mut rx = store.watch();
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let state = rx.borrow_and_update().clone();
                if predicate(&state) {
                    return state;
                }
                rx.changed().await.expect("listener alive");
            }
        })
        .await
        .expect("state change within timeout")
    }

    async fn settled(store: &SessionStore) -> AuthState {
        wait_until(store, |state| !state.is_loading()).await
    }

    #[tokio::test]
    async fn loading_clears_on_first_notification() {
        let provider = MockIdentityProvider::new();
        let store = SessionStore::mount(&provider);
        assert!(store.is_loading());

        let state = settled(&store).await;
        assert_eq!(state, AuthState::Anonymous);
        assert_eq!(store.session(), None);
    }

    #[tokio::test]
    async fn notifications_replace_the_session_wholesale() {
        let provider = MockIdentityProvider::new();
        let store = SessionStore::mount(&provider);
        settled(&store).await;

        let session = Session {
            user_id: "u-1".to_string(),
            email: "a@x.com".to_string(),
        };
        provider.emit(Some(session.clone()));
        let state = wait_until(&store, AuthState::is_authenticated).await;
        assert_eq!(state.session(), Some(&session));

        provider.emit(None);
        let state = wait_until(&store, |state| !state.is_authenticated()).await;
        assert_eq!(state, AuthState::Anonymous);
        assert_eq!(store.session(), None);
    }

    #[tokio::test]
    async fn unmount_is_idempotent_and_stops_updates() {
        let provider = MockIdentityProvider::new();
        let store = SessionStore::mount(&provider);
        settled(&store).await;

        store.unmount();
        store.unmount();

        provider.emit(Some(Session {
            user_id: "u-1".to_string(),
            email: "a@x.com".to_string(),
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.state(), AuthState::Anonymous);
    }
}
