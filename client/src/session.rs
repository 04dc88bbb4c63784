//! Session context: the single authoritative view of who is signed in.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owned by [`crate::app::App`] and handed out by clone. Every transition goes
//! through a method here; observers follow changes through [`Session::subscribe`].
//!
//! STATE MACHINE
//! =============
//! `Unresolved` (storage not read yet) moves once to `Anonymous` or
//! `Authenticated(user)` in [`Session::init`]. Afterwards `login`, `logout`,
//! `update_user` and `expire` move between the two resolved states. There is
//! no way back to `Unresolved` and no background expiry check: an expired
//! token is only discovered when a request comes back 401.

use std::sync::Arc;

use tokio::sync::watch;
use wire::User;

use crate::net::ApiError;
use crate::storage::{
    AUTH_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY, StorageError, USER_KEY, clear_credentials,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted credentials have not been read yet.
    Unresolved,
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no user is signed in")]
    NotAuthenticated,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => e.into(),
            SessionError::NotAuthenticated => Self::NotAuthenticated,
        }
    }
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
}

impl Session {
    /// A session in the `Unresolved` state; call [`Session::init`] before use.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self { inner: Arc::new(SessionInner { store, state }) }
    }

    /// Resolve the session from persisted credentials.
    ///
    /// A stored user that does not parse is treated as corruption: storage is
    /// cleared and the session resolves to `Anonymous`. Calling `init` again
    /// after the first resolution returns the current state unchanged.
    pub fn init(&self) -> SessionState {
        if !self.state().is_loading() {
            return self.state();
        }
        let resolved = self.read_persisted();
        self.set(resolved.clone());
        resolved
    }

    fn read_persisted(&self) -> SessionState {
        let store = self.inner.store.as_ref();
        let (token, saved_user) = match (store.get(AUTH_TOKEN_KEY), store.get(USER_KEY)) {
            (Ok(token), Ok(user)) => (token, user),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "credential store unreadable; starting signed out");
                return SessionState::Anonymous;
            }
        };
        let (Some(_), Some(saved_user)) = (token, saved_user) else {
            return SessionState::Anonymous;
        };
        match serde_json::from_str::<User>(&saved_user) {
            Ok(user) => {
                tracing::debug!(user = %user.id, "session restored");
                SessionState::Authenticated(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored user is corrupt; clearing credentials");
                if let Err(e) = clear_credentials(store) {
                    tracing::warn!(error = %e, "could not clear corrupt credentials");
                }
                SessionState::Anonymous
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    /// Follow state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Persist credentials and mark `user` as signed in.
    ///
    /// Without a refresh token any previously stored one is dropped so it can
    /// never be paired with the new access token.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential write fails; the state is left as it was.
    pub fn login(&self, access_token: &str, refresh_token: Option<&str>, user: User) -> Result<(), SessionError> {
        let store = self.inner.store.as_ref();
        store.set(AUTH_TOKEN_KEY, access_token)?;
        match refresh_token {
            Some(refresh_token) => store.set(REFRESH_TOKEN_KEY, refresh_token)?,
            None => store.remove(REFRESH_TOKEN_KEY)?,
        }
        store.set(USER_KEY, &serde_json::to_string(&user).map_err(StorageError::from)?)?;
        tracing::info!(user = %user.id, "signed in");
        self.set(SessionState::Authenticated(user));
        Ok(())
    }

    /// Clear every credential and sign out. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential could not be removed; the session is
    /// signed out regardless.
    pub fn logout(&self) -> Result<(), SessionError> {
        let cleared = clear_credentials(self.inner.store.as_ref());
        if self.is_authenticated() {
            tracing::info!("signed out");
        }
        self.set(SessionState::Anonymous);
        cleared.map_err(SessionError::from)
    }

    /// Replace the cached profile of the signed-in user. Tokens are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when nobody is signed in, or a
    /// storage error if the profile could not be persisted.
    pub fn update_user(&self, user: User) -> Result<(), SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        let encoded = serde_json::to_string(&user).map_err(StorageError::from)?;
        self.inner.store.set(USER_KEY, &encoded)?;
        self.set(SessionState::Authenticated(user));
        Ok(())
    }

    /// React to the HTTP layer reporting unrecoverable authorization failure.
    pub fn expire(&self) {
        if let Err(e) = self.logout() {
            tracing::warn!(error = %e, "credential cleanup after expiry incomplete");
        }
        tracing::warn!("session expired");
    }

    fn set(&self, next: SessionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
