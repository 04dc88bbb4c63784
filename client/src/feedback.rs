//! Map a failed submission to what a form shows.

use std::fmt;

use crate::net::ApiError;

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";
pub const CREATE_TEAM_FAILED: &str = "Failed to create team. Please try again.";

/// A message bound to a form field, or to the form as a whole when `field` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFeedback {
    pub field: Option<String>,
    pub message: String,
}

impl FormFeedback {
    /// Prefer the backend's message (on the field it names), then the error's
    /// own description, then `fallback`.
    #[must_use]
    pub fn from_api_error(err: &ApiError, fallback: &str) -> Self {
        let (field, message) = match err {
            ApiError::Status { message, field, .. } => (field.clone(), message.trim().to_owned()),
            other => (None, other.to_string()),
        };
        if message.is_empty() {
            Self { field: None, message: fallback.to_owned() }
        } else {
            Self { field, message }
        }
    }
}

impl fmt::Display for FormFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
