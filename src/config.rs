use std::env;

use leptos::logging::log;
use thiserror::Error;

pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 86_400;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in .env")]
    Missing(&'static str),

    #[error("{key} is not valid: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Server settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_max_age_secs: i64,
    /// Accounts created with one of these emails are admins.
    pub admin_emails: Vec<String>,
    /// Marks the session cookie `Secure`. Turn off only for plain-HTTP development.
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let session_max_age_secs = match lookup("SESSION_MAX_AGE_SECS") {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    key: "SESSION_MAX_AGE_SECS",
                    value,
                })?,
            None => {
                log!(
                    "SESSION_MAX_AGE_SECS not set, using default: {}",
                    DEFAULT_SESSION_MAX_AGE_SECS
                );
                DEFAULT_SESSION_MAX_AGE_SECS
            }
        };

        let admin_emails = lookup("ADMIN_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let secure_cookies = match lookup("SECURE_COOKIES") {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SECURE_COOKIES",
                        value,
                    })
                }
            },
            None => true,
        };

        Ok(Config {
            database_url,
            session_max_age_secs,
            admin_emails,
            secure_cookies,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "ctf.sqlite3")])).unwrap();
        assert_eq!(config.database_url, "ctf.sqlite3");
        assert_eq!(config.session_max_age_secs, DEFAULT_SESSION_MAX_AGE_SECS);
        assert!(config.admin_emails.is_empty());
        assert!(config.secure_cookies);
    }

    #[test]
    fn test_secure_cookies_flag() {
        let off = Config::from_lookup(lookup(&[
            ("DATABASE_URL", ":memory:"),
            ("SECURE_COOKIES", " False "),
        ]))
        .unwrap();
        assert!(!off.secure_cookies);

        let on = Config::from_lookup(lookup(&[
            ("DATABASE_URL", ":memory:"),
            ("SECURE_COOKIES", "1"),
        ]))
        .unwrap();
        assert!(on.secure_cookies);

        let bad = Config::from_lookup(lookup(&[
            ("DATABASE_URL", ":memory:"),
            ("SECURE_COOKIES", "sometimes"),
        ]));
        assert!(matches!(bad, Err(ConfigError::Invalid { key: "SECURE_COOKIES", .. })));
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.to_string(), "DATABASE_URL must be set in .env");
    }

    #[test]
    fn test_admin_emails_and_max_age() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", ":memory:"),
            ("SESSION_MAX_AGE_SECS", "3600"),
            ("ADMIN_EMAILS", " Root@Example.com, ,ops@example.com"),
        ]))
        .unwrap();
        assert_eq!(config.session_max_age_secs, 3600);
        assert_eq!(
            config.admin_emails,
            vec!["root@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert!(config.is_admin_email("ROOT@example.com "));
        assert!(!config.is_admin_email("player@example.com"));
    }

    #[test]
    fn test_invalid_max_age() {
        for bad in ["soon", "0", "-5"] {
            let result = Config::from_lookup(lookup(&[
                ("DATABASE_URL", ":memory:"),
                ("SESSION_MAX_AGE_SECS", bad),
            ]));
            assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        }
    }
}
