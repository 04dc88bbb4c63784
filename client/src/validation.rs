//! Client-side form validation.
//!
//! Each form validates into the wire payload it submits, or into a list of
//! field-scoped errors. Only the first failing rule per field is reported.

use std::fmt;

use reqwest::Url;
use wire::{CreateTeamPayload, LoginCredentials, RegisterData, UpdateTeamPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field (`confirmPassword`, `imageUrl`, ...).
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.0))]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn check(&mut self, field: &'static str, result: Result<(), &'static str>) {
        if let Err(message) = result {
            self.0.push(FieldError { field, message });
        }
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<LoginCredentials, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("email", email(&self.email));
        errors.check("password", required(&self.password, "Password is required"));
        errors.finish(LoginCredentials { email: self.email, password: self.password })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Validate and drop the confirmation field.
    ///
    /// # Errors
    ///
    /// Returns every failing field. A mismatched confirmation is reported on
    /// `confirmPassword`.
    pub fn validate(self) -> Result<RegisterData, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("username", username(&self.username));
        errors.check("email", email(&self.email));
        errors.check("password", password(&self.password));
        errors.check("confirmPassword", confirm(&self.password, &self.confirm_password));
        errors.finish(RegisterData { username: self.username, email: self.email, password: self.password, role: None })
    }
}

/// Create-team form. Empty optional fields are left out of the payload.
#[derive(Debug, Clone, Default)]
pub struct TeamForm {
    pub name: String,
    pub club: String,
    pub color: String,
    pub description: String,
    pub image_url: String,
}

impl TeamForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<CreateTeamPayload, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("name", team_name(&self.name));
        errors.check("club", club_name(&self.club));
        errors.check("description", description(&self.description));
        errors.check("imageUrl", image_url(&self.image_url));
        errors.finish(CreateTeamPayload {
            name: self.name,
            club: self.club,
            color: non_empty(self.color),
            description: non_empty(self.description),
            image_url: non_empty(self.image_url),
        })
    }
}

/// Apply the create-team rules to the fields a partial update provides.
///
/// # Errors
///
/// Returns every failing provided field.
pub fn validate_team_update(patch: UpdateTeamPayload) -> Result<UpdateTeamPayload, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(name) = &patch.name {
        errors.check("name", team_name(name));
    }
    if let Some(club) = &patch.club {
        errors.check("club", club_name(club));
    }
    if let Some(text) = &patch.description {
        errors.check("description", description(text));
    }
    if let Some(url) = &patch.image_url {
        errors.check("imageUrl", image_url(url));
    }
    errors.finish(patch)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn required(value: &str, message: &'static str) -> Result<(), &'static str> {
    if value.is_empty() { Err(message) } else { Ok(()) }
}

fn email(value: &str) -> Result<(), &'static str> {
    required(value, "Email is required")?;
    if is_email(value) { Ok(()) } else { Err("Please enter a valid email address") }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn username(value: &str) -> Result<(), &'static str> {
    let len = value.chars().count();
    if len < 3 {
        return Err("Username must be at least 3 characters");
    }
    if len > 20 {
        return Err("Username must be less than 20 characters");
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username can only contain letters, numbers, and underscores");
    }
    Ok(())
}

fn password(value: &str) -> Result<(), &'static str> {
    if value.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    let lower = value.chars().any(|c| c.is_ascii_lowercase());
    let upper = value.chars().any(|c| c.is_ascii_uppercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Err("Password must contain at least one lowercase letter, one uppercase letter, and one number");
    }
    Ok(())
}

fn confirm(password: &str, confirmation: &str) -> Result<(), &'static str> {
    required(confirmation, "Please confirm your password")?;
    if password == confirmation { Ok(()) } else { Err("Passwords don't match") }
}

fn team_name(value: &str) -> Result<(), &'static str> {
    bounded(value, "Team name is required", "Team name must be at least 2 characters", "Team name must be less than 50 characters")
}

fn club_name(value: &str) -> Result<(), &'static str> {
    bounded(value, "Club name is required", "Club name must be at least 2 characters", "Club name must be less than 50 characters")
}

fn bounded(value: &str, missing: &'static str, short: &'static str, long: &'static str) -> Result<(), &'static str> {
    match value.chars().count() {
        0 => Err(missing),
        1 => Err(short),
        51.. => Err(long),
        _ => Ok(()),
    }
}

fn description(value: &str) -> Result<(), &'static str> {
    if value.chars().count() > 200 { Err("Description must be less than 200 characters") } else { Ok(()) }
}

fn image_url(value: &str) -> Result<(), &'static str> {
    if value.is_empty() || Url::parse(value).is_ok() { Ok(()) } else { Err("Please enter a valid URL") }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
