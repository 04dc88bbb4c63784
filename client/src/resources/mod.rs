//! Data bindings over the query cache.
//!
//! Reads go through [`QueryCache::fetch`] and are only issued for a signed-in
//! session; writes go through [`QueryCache::mutate`] and invalidate the keys
//! they affect.

pub mod auth;
pub mod teams;
pub mod users;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::net::{ApiClient, ApiError};
use crate::query::{QueryCache, QueryKey};
use crate::session::Session;

pub use auth::Auth;
pub use teams::Teams;
pub use users::Users;

/// Handles shared by every resource binding.
#[derive(Clone)]
pub struct ResourceContext {
    pub(crate) api: ApiClient,
    pub(crate) session: Session,
    pub(crate) cache: QueryCache,
}

impl ResourceContext {
    #[must_use]
    pub fn new(api: ApiClient, session: Session, cache: QueryCache) -> Self {
        Self { api, session, cache }
    }

    fn require_session(&self) -> Result<(), ApiError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::NotAuthenticated)
        }
    }

    /// Cached `GET path` under `key`, gated on a signed-in session.
    async fn read<T>(&self, key: QueryKey, stale_time: Duration, path: String) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.require_session()?;
        let api = self.api.clone();
        self.cache
            .fetch(key, stale_time, move || {
                let api = api.clone();
                let path = path.clone();
                async move { api.get::<T>(&path).await }
            })
            .await
    }

    fn stale_time(&self) -> Duration {
        self.cache.config().stale_time
    }
}

/// By-id reads are skipped when the id is empty.
fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() { Err(ApiError::MissingId) } else { Ok(()) }
}
