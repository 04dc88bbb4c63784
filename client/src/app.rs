//! Application root: owns the shared handles and wires them together.
//!
//! Everything that would otherwise be process-global (HTTP client, session,
//! query cache) lives here and is handed out by clone. The root also listens
//! for [`AuthSignal::SessionExpired`] from the HTTP layer and, in response,
//! signs the session out and forgets every cached read.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::net::{ApiClient, ApiError, AuthSignal};
use crate::query::QueryCache;
use crate::resources::{Auth, ResourceContext, Teams, Users};
use crate::session::Session;
use crate::storage::CredentialStore;

pub struct App {
    config: ClientConfig,
    ctx: ResourceContext,
    expiry_listener: JoinHandle<()>,
}

impl App {
    /// Build the root and resolve the session from `store`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config, Arc::clone(&store))?;
        let session = Session::new(store);
        let cache = QueryCache::new(config.query);
        let expiry_listener = spawn_expiry_listener(api.subscribe(), session.clone(), cache.clone());
        session.init();
        tracing::debug!(base_url = %config.base_url, signed_in = session.is_authenticated(), "app ready");
        Ok(Self { config, ctx: ResourceContext::new(api, session, cache), expiry_listener })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.ctx.api
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.ctx.session
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.ctx.cache
    }

    #[must_use]
    pub fn auth(&self) -> Auth {
        Auth::new(self.ctx.clone())
    }

    #[must_use]
    pub fn teams(&self) -> Teams {
        Teams::new(self.ctx.clone())
    }

    #[must_use]
    pub fn users(&self) -> Users {
        Users::new(self.ctx.clone())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.expiry_listener.abort();
    }
}

fn spawn_expiry_listener(
    mut signals: broadcast::Receiver<AuthSignal>,
    session: Session,
    cache: QueryCache,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(AuthSignal::SessionExpired) => {}
                // A missed signal can only have been an expiry.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "auth signals lagged");
                }
                Err(RecvError::Closed) => break,
            }
            cache.clear();
            session.expire();
        }
    })
}

#[cfg(test)]
#[path = "app_test.rs"]
mod tests;
