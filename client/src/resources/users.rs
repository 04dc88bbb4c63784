use wire::User;

use super::{ResourceContext, require_id};
use crate::net::{ApiError, endpoints};
use crate::query::keys;

#[derive(Clone)]
pub struct Users {
    ctx: ResourceContext,
}

impl Users {
    #[must_use]
    pub fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    /// # Errors
    ///
    /// [`ApiError::NotAuthenticated`] without a session, otherwise any read error.
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.ctx.read(keys::users(), self.ctx.stale_time(), endpoints::USERS.to_owned()).await
    }

    /// # Errors
    ///
    /// [`ApiError::MissingId`] for an empty id, [`ApiError::NotAuthenticated`]
    /// without a session, otherwise any read error.
    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        require_id(id)?;
        self.ctx.read(keys::user(id), self.ctx.stale_time(), endpoints::user(id)).await
    }
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
