//! Persistent credential storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The access token, refresh token and cached user profile live under three
//! independent namespaced keys, the way a browser front end keeps them in
//! `localStorage`. Writes to the three keys are not atomic; callers treat the
//! store as best effort and self-repair on inconsistent reads.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key holding the bearer access token.
pub const AUTH_TOKEN_KEY: &str = "basketeasy_auth_token";
/// Key holding the long-lived refresh token.
pub const REFRESH_TOKEN_KEY: &str = "basketeasy_refresh_token";
/// Key holding the JSON-serialized [`wire::User`].
pub const USER_KEY: &str = "basketeasy_user";

/// Every key owned by the session, cleared together on sign-out.
pub const CREDENTIAL_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("credential value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value store for session credentials.
///
/// Implementations must be cheap to call from async code; both bundled
/// stores do their work synchronously behind a mutex.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remove every credential key. All removals are attempted; the first error wins.
pub fn clear_credentials(store: &dyn CredentialStore) -> Result<(), StorageError> {
    let mut first_err = None;
    for key in CREDENTIAL_KEYS {
        if let Err(e) = store.remove(key) {
            tracing::warn!(key, error = %e, "failed to clear credential key");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
