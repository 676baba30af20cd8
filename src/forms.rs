use serde::{Deserialize, Serialize};

use crate::error::CtfError;
use crate::model::{Category, NewChallenge};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_TEAM_NAME_LEN: usize = 64;

/// The admin "add challenge" form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeForm {
    pub title: String,
    pub category: String,
    pub points: String,
    pub description: String,
    pub resource_link: String,
    pub flag: String,
}

impl ChallengeForm {
    pub fn validate(&self) -> Result<NewChallenge, CtfError> {
        let title = required(&self.title, "Challenge title")?;
        let category = self
            .category
            .parse::<Category>()
            .map_err(|_| CtfError::validation("Category is required"))?;
        let points = self
            .points
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|p| *p >= 0)
            .ok_or_else(|| CtfError::validation("Points must be a non-negative number"))?;
        let description = required(&self.description, "Description")?;
        let flag = required(&self.flag, "Flag")?;

        let resource_link = match self.resource_link.trim() {
            "" => None,
            link if link.starts_with("http://") || link.starts_with("https://") => {
                Some(link.to_string())
            }
            _ => {
                return Err(CtfError::validation(
                    "Resource link must start with http:// or https://",
                ))
            }
        };

        Ok(NewChallenge {
            title,
            category,
            points,
            description,
            resource_link,
            flag,
        })
    }
}

/// The landing page's sign-in / sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthForm {
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        team_name: String,
        email: String,
        password: String,
    },
}

impl AuthForm {
    /// Checks the form and returns it with surrounding whitespace stripped from everything but
    /// the password.
    pub fn validate(&self) -> Result<AuthForm, CtfError> {
        match self {
            AuthForm::SignIn { email, password } => {
                let email = validate_email(email)?;
                if password.is_empty() {
                    return Err(CtfError::validation("Password is required"));
                }
                Ok(AuthForm::SignIn {
                    email,
                    password: password.clone(),
                })
            }
            AuthForm::SignUp {
                team_name,
                email,
                password,
            } => {
                let team_name = validate_team_name(team_name)?;
                let email = validate_email(email)?;
                if password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(CtfError::validation(format!(
                        "Password must be at least {} characters",
                        MIN_PASSWORD_LEN
                    )));
                }
                Ok(AuthForm::SignUp {
                    team_name,
                    email,
                    password: password.clone(),
                })
            }
        }
    }
}

pub fn validate_team_name(team_name: &str) -> Result<String, CtfError> {
    let team_name = required(team_name, "Team name")?;
    if team_name.chars().count() > MAX_TEAM_NAME_LEN {
        return Err(CtfError::validation(format!(
            "Team name must be at most {} characters",
            MAX_TEAM_NAME_LEN
        )));
    }
    Ok(team_name)
}

fn validate_email(email: &str) -> Result<String, CtfError> {
    let email = required(email, "Email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_lowercase())
        }
        _ => Err(CtfError::validation("Email is not valid")),
    }
}

fn required(value: &str, field: &str) -> Result<String, CtfError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CtfError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}
