//! REST paths consumed from the backend.
//!
//! Ids are percent-encoded as single path segments, so an id containing `/`
//! can never address a different route.

use urlencoding::encode;

pub const AUTH_LOGIN: &str = "/api/auth/login";
pub const AUTH_REGISTER: &str = "/api/auth/register";
pub const AUTH_REFRESH: &str = "/api/auth/refresh";
pub const AUTH_PROFILE: &str = "/api/auth/profile";

pub const USERS: &str = "/api/users";
pub const TEAMS: &str = "/api/teams";

#[must_use]
pub fn user(id: &str) -> String {
    format!("{USERS}/{}", encode(id))
}

#[must_use]
pub fn team(id: &str) -> String {
    format!("{TEAMS}/{}", encode(id))
}

#[must_use]
pub fn team_members(id: &str) -> String {
    format!("{TEAMS}/{}/members", encode(id))
}

#[must_use]
pub fn team_member(id: &str, user_id: &str) -> String {
    format!("{TEAMS}/{}/members/{}", encode(id), encode(user_id))
}

#[cfg(test)]
#[path = "endpoints_test.rs"]
mod tests;
