//! Sign-in, registration and the current-user profile.

use wire::{AuthResponse, LoginCredentials, RegisterData, User};

use super::ResourceContext;
use crate::net::{ApiError, endpoints};
use crate::query::keys;

#[derive(Clone)]
pub struct Auth {
    ctx: ResourceContext,
}

impl Auth {
    #[must_use]
    pub fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (typically 401 "Invalid credentials"),
    /// or [`ApiError::InvalidResponse`] if the reply lacks a token or user.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, ApiError> {
        let response: AuthResponse = self.ctx.api.post(endpoints::AUTH_LOGIN, credentials).await?;
        self.establish(response)
    }

    /// Create an account and sign straight into it.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (e.g. 409 with `field = "username"`),
    /// or [`ApiError::InvalidResponse`] if the reply lacks a token or user.
    pub async fn register(&self, data: &RegisterData) -> Result<User, ApiError> {
        let response: AuthResponse = self.ctx.api.post(endpoints::AUTH_REGISTER, data).await?;
        self.establish(response)
    }

    /// The signed-in user's profile as the backend currently sees it.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotAuthenticated`] without a session, otherwise any read error.
    pub async fn profile(&self) -> Result<User, ApiError> {
        let stale_time = self.ctx.cache.config().profile_stale_time;
        let user: User = self.ctx.read(keys::profile(), stale_time, endpoints::AUTH_PROFILE.to_owned()).await?;
        if self.ctx.session.user().as_ref() != Some(&user) {
            self.ctx.session.update_user(user.clone())?;
        }
        Ok(user)
    }

    /// Sign out locally and forget every cached read. No backend call is made.
    ///
    /// # Errors
    ///
    /// Returns an error if stored credentials could not be removed; the
    /// session is signed out regardless.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.ctx.cache.clear();
        self.ctx.session.logout()?;
        Ok(())
    }

    fn establish(&self, response: AuthResponse) -> Result<User, ApiError> {
        let (Some(access_token), Some(user)) = (response.access_token, response.user) else {
            return Err(ApiError::InvalidResponse("auth response is missing accessToken or user".into()));
        };
        // Reads cached for a previous user must not leak into this session.
        self.ctx.cache.clear();
        self.ctx.session.login(&access_token, response.refresh_token.as_deref(), user.clone())?;
        Ok(user)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
