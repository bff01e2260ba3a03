//! Runtime configuration and per-user settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::INSECURE_FALLBACK_SECRET;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000/query";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MODEL: &str = "Llama-3-8B-Instruct-q4f32_1-MLC";

/// Everything `serve` needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Endpoint of the external answer service.
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub jwt_secret: String,
}

impl ServerConfig {
    pub fn new(
        port: u16,
        upstream_url: String,
        upstream_timeout_secs: u64,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            port,
            upstream_url,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            jwt_secret: resolve_secret(jwt_secret),
        }
    }
}

/// Use the configured secret, or fall back to the insecure development one.
pub fn resolve_secret(secret: Option<String>) -> String {
    match secret.filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None => {
            tracing::warn!(
                "JWT_SECRET is not set; using the built-in development secret. \
                 This is INSECURE and must not be used in production."
            );
            INSECURE_FALLBACK_SECRET.to_string()
        }
    }
}

/// Color scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    /// Follow the system preference.
    Auto,
}

/// Settings shown on the settings view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: Theme,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Partial update to [`Settings`]; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub model: Option<String>,
}

impl Settings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
    }
}
