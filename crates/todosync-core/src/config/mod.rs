//! Client configuration.
//!
//! `ClientConfig` names the Firebase project the CLI talks to. Values come
//! from a profile file and the environment; neither holds secrets beyond
//! the public web API key.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::FirebaseAuthConfig;
use crate::error::{Error, Result};
use crate::remote::FirestoreConfig;
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_PROJECT_ID: &str = "TODOSYNC_FIREBASE_PROJECT_ID";
pub const ENV_API_KEY: &str = "TODOSYNC_FIREBASE_API_KEY";
pub const ENV_FIRESTORE_URL: &str = "TODOSYNC_FIRESTORE_URL";
pub const ENV_AUTH_EMULATOR_URL: &str = "TODOSYNC_AUTH_EMULATOR_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TODOSYNC_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub firebase_project_id: Option<String>,
    #[serde(default)]
    pub firebase_api_key: Option<String>,
    #[serde(default)]
    pub firestore_url: Option<String>,
    #[serde(default)]
    pub auth_emulator_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Read values through `lookup`, normally `std::env::var(..).ok()`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let request_timeout_secs = match normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS))
        {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("{ENV_REQUEST_TIMEOUT_SECS} must be a whole number"))
            })?),
            None => None,
        };

        Ok(Self {
            firebase_project_id: normalize_text_option(lookup(ENV_PROJECT_ID)),
            firebase_api_key: normalize_text_option(lookup(ENV_API_KEY)),
            firestore_url: normalize_text_option(lookup(ENV_FIRESTORE_URL)),
            auth_emulator_url: normalize_text_option(lookup(ENV_AUTH_EMULATOR_URL)),
            request_timeout_secs,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Values set in `overrides` win; unset ones fall back to `self`.
    #[must_use]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            firebase_project_id: overrides.firebase_project_id.or(self.firebase_project_id),
            firebase_api_key: overrides.firebase_api_key.or(self.firebase_api_key),
            firestore_url: overrides.firestore_url.or(self.firestore_url),
            auth_emulator_url: overrides.auth_emulator_url.or(self.auth_emulator_url),
            request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
        }
    }

    /// Trim values, drop empties, and reject malformed URLs.
    pub fn normalized(self) -> Result<Self> {
        let firestore_url = normalize_url(self.firestore_url, "firestore_url")?;
        let auth_emulator_url = normalize_url(self.auth_emulator_url, "auth_emulator_url")?;
        if self.request_timeout_secs == Some(0) {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            firebase_project_id: normalize_text_option(self.firebase_project_id),
            firebase_api_key: normalize_text_option(self.firebase_api_key),
            firestore_url,
            auth_emulator_url,
            request_timeout_secs: self.request_timeout_secs,
        })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn firestore_config(&self) -> Result<FirestoreConfig> {
        let project_id = self.firebase_project_id.clone().ok_or_else(|| {
            Error::Config(format!("Firebase project id is not set ({ENV_PROJECT_ID})"))
        })?;

        let mut config = FirestoreConfig::new(project_id).with_timeout(self.request_timeout());
        if let Some(api_key) = &self.firebase_api_key {
            config = config.with_api_key(api_key.clone());
        }
        if let Some(url) = &self.firestore_url {
            config = config.with_base_url(url.clone());
        }
        Ok(config)
    }

    pub fn auth_config(&self) -> Result<FirebaseAuthConfig> {
        let api_key = self.firebase_api_key.clone().ok_or_else(|| {
            Error::Config(format!("Firebase API key is not set ({ENV_API_KEY})"))
        })?;

        let config = FirebaseAuthConfig::new(api_key);
        Ok(match &self.auth_emulator_url {
            Some(host) => config.with_emulator(host),
            None => config,
        })
    }
}

fn normalize_url(raw: Option<String>, field: &str) -> Result<Option<String>> {
    match normalize_text_option(raw) {
        Some(url) if is_http_url(&url) => Ok(Some(url.trim_end_matches('/').to_string())),
        Some(_) => Err(Error::Config(format!(
            "{field} must include http:// or https://"
        ))),
        None => Ok(None),
    }
}
