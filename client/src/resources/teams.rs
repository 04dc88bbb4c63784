//! Team and membership bindings.

use serde_json::Value;
use wire::{AddMemberPayload, CreateTeamPayload, Team, TeamMember, UpdateTeamPayload};

use super::{ResourceContext, require_id};
use crate::net::{ApiError, endpoints};
use crate::query::keys;

#[derive(Clone)]
pub struct Teams {
    ctx: ResourceContext,
}

impl Teams {
    #[must_use]
    pub fn new(ctx: ResourceContext) -> Self {
        Self { ctx }
    }

    /// Teams visible to the signed-in user.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotAuthenticated`] without a session, otherwise any read error.
    pub async fn list(&self) -> Result<Vec<Team>, ApiError> {
        self.ctx.read(keys::teams(), self.ctx.stale_time(), endpoints::TEAMS.to_owned()).await
    }

    /// # Errors
    ///
    /// [`ApiError::MissingId`] for an empty id, [`ApiError::NotAuthenticated`]
    /// without a session, otherwise any read error.
    pub async fn get(&self, id: &str) -> Result<Team, ApiError> {
        require_id(id)?;
        self.ctx.read(keys::team(id), self.ctx.stale_time(), endpoints::team(id)).await
    }

    /// # Errors
    ///
    /// Same as [`Teams::get`].
    pub async fn members(&self, id: &str) -> Result<Vec<TeamMember>, ApiError> {
        require_id(id)?;
        self.ctx.read(keys::team_members(id), self.ctx.stale_time(), endpoints::team_members(id)).await
    }

    /// # Errors
    ///
    /// Returns the backend's rejection, e.g. 409 with `field = "name"`.
    pub async fn create(&self, payload: &CreateTeamPayload) -> Result<Team, ApiError> {
        let team: Team = self.ctx.cache.mutate(self.ctx.api.post(endpoints::TEAMS, payload), &[keys::teams()]).await?;
        tracing::info!(team = %team.id, name = %team.name, "team created");
        Ok(team)
    }

    /// Replace the provided fields of team `id`.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection.
    pub async fn update(&self, id: &str, payload: &UpdateTeamPayload) -> Result<Team, ApiError> {
        require_id(id)?;
        self.ctx
            .cache
            .mutate(self.ctx.api.put(&endpoints::team(id), payload), &[keys::teams(), keys::team(id)])
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's rejection.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        require_id(id)?;
        let _: Value = self.ctx.cache.mutate(self.ctx.api.delete(&endpoints::team(id)), &[keys::teams()]).await?;
        tracing::info!(team = id, "team deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the backend's rejection, e.g. 409 for an existing member.
    pub async fn add_member(&self, id: &str, payload: &AddMemberPayload) -> Result<TeamMember, ApiError> {
        require_id(id)?;
        self.ctx
            .cache
            .mutate(self.ctx.api.post(&endpoints::team_members(id), payload), &[keys::team(id), keys::teams()])
            .await
    }

    /// # Errors
    ///
    /// Returns the backend's rejection.
    pub async fn remove_member(&self, id: &str, user_id: &str) -> Result<(), ApiError> {
        require_id(id)?;
        require_id(user_id)?;
        let _: Value = self
            .ctx
            .cache
            .mutate(self.ctx.api.delete(&endpoints::team_member(id, user_id)), &[keys::team(id), keys::teams()])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "teams_test.rs"]
mod tests;
