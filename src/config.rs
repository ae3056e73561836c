use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub const ENV_SECRET: &str = "DASHBOARD_PASS_SECRET";
pub const ENV_API_URL: &str = "DASHBOARD_API_URL";
pub const ENV_STORAGE_KEY: &str = "DASHBOARD_STORAGE_KEY";
pub const ENV_STORE_DIR: &str = "DASHBOARD_STORE_DIR";

/// Settings shared by the session resolver, the route gate and the REST client.
///
/// Resolution order: built-in defaults, then an optional JSON file, then the
/// `DASHBOARD_*` environment variables.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret the credential blob is sealed with.
    pub secret: String,
    /// Base URL of the dashboard backend.
    pub api_url: String,
    /// Storage key holding the sealed credential.
    pub storage_key: String,
    /// Directory for the file-backed credential store; in-memory when unset.
    pub store_dir: Option<String>,

    pub sign_in_path: String,
    pub unauthorized_path: String,
    pub landing_path: String,
    pub dashboard_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            api_url: "http://localhost:3000".to_string(),
            storage_key: "token".to_string(),
            store_dir: None,
            sign_in_path: "/sign-in".to_string(),
            unauthorized_path: "/404".to_string(),
            landing_path: "/landing".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

// Never print the secret.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &if self.secret.is_empty() { "<empty>" } else { "<redacted>" })
            .field("api_url", &self.api_url)
            .field("storage_key", &self.storage_key)
            .field("store_dir", &self.store_dir)
            .field("sign_in_path", &self.sign_in_path)
            .field("unauthorized_path", &self.unauthorized_path)
            .field("landing_path", &self.landing_path)
            .field("dashboard_path", &self.dashboard_path)
            .finish()
    }
}

impl AuthConfig {
    pub fn from_json_str(text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|e| AppError::config("invalid_config".to_string(), e.to_string()))
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::config("config_unreadable".to_string(), format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Overlay values from an environment lookup. Unset or empty variables keep the current value.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_SECRET) { self.secret = v; }
        if let Some(v) = get(ENV_API_URL) { self.api_url = v; }
        if let Some(v) = get(ENV_STORAGE_KEY) { self.storage_key = v; }
        if let Some(v) = get(ENV_STORE_DIR) { self.store_dir = Some(v); }
        self
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_with(|k| std::env::var(k).ok())
    }

    /// Defaults, then `file` when given, then the process environment.
    pub fn load(file: Option<&Path>) -> AppResult<Self> {
        let base = match file {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let cfg = base.apply_env();
        if cfg.secret.is_empty() {
            warn!(target: "config", "{} is not set; credentials are sealed with an empty secret", ENV_SECRET);
        }
        debug!(target: "config", "resolved {:?}", cfg);
        Ok(cfg)
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_dashboard_paths() {
        let c = AuthConfig::default();
        assert_eq!(c.storage_key, "token");
        assert_eq!(c.sign_in_path, "/sign-in");
        assert_eq!(c.unauthorized_path, "/404");
        assert_eq!(c.landing_path, "/landing");
    }

    #[test]
    fn json_layer_keeps_unspecified_defaults() {
        let c = AuthConfig::from_json_str(r#"{"api_url":"https://api.example.org","storage_key":"cred"}"#).unwrap();
        assert_eq!(c.api_url, "https://api.example.org");
        assert_eq!(c.storage_key, "cred");
        assert_eq!(c.sign_in_path, "/sign-in");
        assert!(AuthConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn env_layer_overrides_and_ignores_blank_values() {
        let env: HashMap<&str, &str> = [(ENV_SECRET, "s3cr3t"), (ENV_API_URL, "  "), (ENV_STORE_DIR, "/tmp/gate")].into_iter().collect();
        let c = AuthConfig::default().apply_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.secret, "s3cr3t");
        assert_eq!(c.api_url, "http://localhost:3000");
        assert_eq!(c.store_dir.as_deref(), Some("/tmp/gate"));
    }

    #[test]
    fn debug_redacts_secret() {
        let c = AuthConfig::default().with_secret("hunter2");
        let shown = format!("{:?}", c);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }
}
