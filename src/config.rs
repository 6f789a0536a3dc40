//! Run settings loaded from an optional `bulksub.toml`.
//!
//! Values missing from the file use defaults. Environment variables override
//! the file; they are looked up in the process environment first, then in an
//! env file (`local.env` by default) that is parsed without touching the
//! process environment.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::auth::TokenRequest;
use crate::dispatch::{RequestTemplate, SubscribePayload};
use crate::error::RunError;

pub const DEFAULT_CONFIG_FILE: &str = "bulksub.toml";
pub const DEFAULT_ENV_FILE: &str = "local.env";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub subscribe: SubscribeSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

/// Target of the subscribe calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub offer: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub reboot_after_next_trip: bool,
}

/// Credentials for the token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_grant_type() -> String {
    "password".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            grant_type: default_grant_type(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Settings {
    /// Load `config_path` (if present) and apply environment overrides.
    pub fn load(config_path: &Path, env_file: &Path) -> Result<Self, RunError> {
        let mut settings = if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            toml::from_str::<Settings>(&contents)?
        } else {
            Self::default()
        };

        let file_vars = read_env_file(env_file)?;
        settings.apply_env(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()));
        settings.validate()?;
        Ok(settings)
    }

    /// Override fields from `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("SUB_BASE_URL") {
            self.subscribe.base_url = v;
        }
        if let Some(v) = get("SUB_OFFER") {
            self.subscribe.offer = v;
        }
        if let Some(v) = get("SUB_ACCOUNT") {
            self.subscribe.account = v;
        }
        if let Some(v) = get("SUB_REBOOT_AFTER_NEXT_TRIP") {
            self.subscribe.reboot_after_next_trip = matches!(v.as_str(), "1" | "true" | "TRUE" | "yes");
        }
        if let Some(v) = get("AUTH_BASE_URL") {
            self.auth.base_url = v;
        }
        if let Some(v) = get("AUTH_GRANT_TYPE") {
            self.auth.grant_type = v;
        }
        if let Some(v) = get("AUTH_USERNAME") {
            self.auth.username = v;
        }
        if let Some(v) = get("AUTH_PASSWORD") {
            self.auth.password = v;
        }
    }

    pub fn validate(&self) -> Result<(), RunError> {
        let required = [
            ("SUB_BASE_URL", &self.subscribe.base_url),
            ("SUB_OFFER", &self.subscribe.offer),
            ("SUB_ACCOUNT", &self.subscribe.account),
            ("AUTH_BASE_URL", &self.auth.base_url),
            ("AUTH_GRANT_TYPE", &self.auth.grant_type),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(RunError::Config(format!(
                "missing settings: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    pub fn request_template(&self) -> RequestTemplate {
        RequestTemplate::subscribe(
            &self.subscribe.base_url,
            SubscribePayload {
                offer: self.subscribe.offer.clone(),
                account: self.subscribe.account.clone(),
                reboot_after_next_trip: self.subscribe.reboot_after_next_trip,
            },
        )
    }

    pub fn token_request(&self) -> TokenRequest {
        TokenRequest {
            base_url: self.auth.base_url.clone(),
            grant_type: self.auth.grant_type.clone(),
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
        }
    }
}

/// Parse `KEY=value` pairs from an env file. A missing file yields nothing.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, RunError> {
    if !path.exists() {
        debug!(path = %path.display(), "no env file");
        return Ok(HashMap::new());
    }
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| RunError::Config(format!("cannot read {}: {e}", path.display())))?;
    iter.collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| RunError::Config(format!("cannot parse {}: {e}", path.display())))
}

/// Validate the worker count given on the command line.
pub fn worker_count(raw: i64) -> Result<NonZeroUsize, RunError> {
    usize::try_from(raw)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            RunError::Config(format!(
                "worker count must be a positive integer, got {raw}"
            ))
        })
}
