//! Process settings read from the environment.

use std::path::PathBuf;

use secrecy::SecretString;
use tabpub_github::DEFAULT_API_URL;
use tabpub_tableau::TableauConfig;
use thiserror::Error;

pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GITHUB_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const USERNAME: &str = "USERNAME";
pub const PASSWORD: &str = "PASSWORD";
pub const TABLEAU_URL: &str = "TABLEAU_URL";
pub const SITE_ID: &str = "SITE_ID";
pub const TABLEAU_API_VERSION: &str = "TABLEAU_API_VERSION";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

#[derive(Debug)]
pub struct Settings {
    /// `owner/name`
    pub repository: String,
    pub event_path: PathBuf,
    pub github_api_url: String,
    pub tableau: TableauConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from `lookup`; every absent or blank required variable
    /// is named in the error. `SITE_ID` may be blank (the default site).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut missing = Vec::new();
        let mut required = |key: &'static str, allow_blank: bool| match lookup(key) {
            Some(value) if allow_blank || !value.trim().is_empty() => value,
            _ => {
                missing.push(key);
                String::new()
            }
        };

        let repository = required(GITHUB_REPOSITORY, false);
        let event_path = required(GITHUB_EVENT_PATH, false);
        let username = required(USERNAME, false);
        let password = required(PASSWORD, false);
        let server_url = required(TABLEAU_URL, false);
        let site = required(SITE_ID, true);
        if !missing.is_empty() {
            return Err(SettingsError::Missing(missing));
        }

        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut tableau =
            TableauConfig::new(&server_url, site, username, SecretString::from(password));
        if let Some(version) = optional(TABLEAU_API_VERSION) {
            tableau = tableau.with_api_version(version);
        }

        Ok(Self {
            repository,
            event_path: PathBuf::from(event_path),
            github_api_url: optional(GITHUB_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            tableau,
        })
    }
}
