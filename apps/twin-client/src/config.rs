//! Client configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use twin_core::{ClientConfig, HealthCheckConfig};

/// Terminal client configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL.
    /// Override: `TWIN_BACKEND_URL`
    pub backend_url: String,

    /// Delay before each reconnect (milliseconds).
    /// Override: `TWIN_RECONNECT_DELAY_MS`
    pub reconnect_delay_ms: u64,

    /// Scenario bootstrap path; unset means the offline seed.
    pub scenario_path: Option<String>,

    /// Poll the health endpoint before connecting.
    pub health_check: Option<HealthCheckConfig>,

    /// Keep-alive ping interval in seconds.
    pub keepalive_interval_secs: Option<u64>,

    /// Speak notifications on start.
    pub voice: bool,

    /// Move the map view on disruptions.
    pub auto_zoom: bool,

    /// Maximum number of animated trucks.
    pub truck_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let core = ClientConfig::default();
        Self {
            backend_url: core.backend_url,
            reconnect_delay_ms: core.reconnect_delay_ms,
            scenario_path: core.scenario_path,
            health_check: core.health_check,
            keepalive_interval_secs: core.keepalive_interval_secs,
            voice: core.voice_on,
            auto_zoom: core.auto_zoom_on,
            truck_cap: core.truck_cap,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        // an empty file is a valid "all defaults" config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TWIN_BACKEND_URL") {
            self.backend_url = url;
        }

        if let Some(val) = var("TWIN_RECONNECT_DELAY_MS") {
            match val.parse() {
                Ok(ms) => self.reconnect_delay_ms = ms,
                Err(_) => log::warn!("Ignoring invalid TWIN_RECONNECT_DELAY_MS={}", val),
            }
        }

        // Note: TWIN_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to twin-core's config type and validates it.
    pub fn to_core_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig {
            backend_url: self.backend_url.clone(),
            reconnect_delay_ms: self.reconnect_delay_ms,
            scenario_path: self.scenario_path.clone(),
            health_check: self.health_check.clone(),
            keepalive_interval_secs: self.keepalive_interval_secs,
            voice_on: self.voice,
            auto_zoom_on: self.auto_zoom,
            truck_cap: self.truck_cap,
            ..Default::default()
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}
