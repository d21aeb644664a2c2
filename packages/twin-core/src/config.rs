//! Client configuration and backend URL building.
//!
//! [`ClientConfig`] carries every tunable the client needs. All fields have
//! defaults so a partial YAML file (or none at all) is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TwinError, TwinResult};
use crate::protocol_constants::{
    COMMAND_PATH, DEFAULT_ANIMATION_FRAME_MS, DEFAULT_BACKEND_URL, DEFAULT_HEALTH_CHECK_ATTEMPTS,
    DEFAULT_HEALTH_CHECK_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_TRUCK_CAP,
    DEFAULT_TRUCK_SPEED, EVENTS_WS_PATH, HEALTH_PATH,
};

/// Health check run before the first feed connection.
///
/// Tolerates a cold-starting backend: the client polls the health endpoint
/// until it answers 2xx or the attempts run out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Maximum number of checks.
    pub max_attempts: u32,
    /// Spacing between checks (milliseconds).
    pub interval_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HEALTH_CHECK_ATTEMPTS,
            interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration for the twin client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    // Backend
    /// Base HTTP(S) URL of the backend. The feed URL swaps the scheme to ws(s).
    pub backend_url: String,
    /// Path of the event stream.
    pub events_path: String,
    /// Path of the command endpoint.
    pub command_path: String,
    /// Path of the health endpoint.
    pub health_path: String,
    /// Path of the scenario bootstrap endpoint (`None` = use the offline seed).
    pub scenario_path: Option<String>,

    // Feed
    /// Fixed delay before each reconnect attempt (milliseconds).
    pub reconnect_delay_ms: u64,
    /// Optional health check before the first connection.
    pub health_check: Option<HealthCheckConfig>,
    /// Optional keep-alive ping interval (seconds).
    pub keepalive_interval_secs: Option<u64>,

    // Rendering
    /// Animation frame interval (milliseconds).
    pub animation_frame_ms: u64,
    /// Truck speed as a fraction of its route per second.
    pub truck_speed: f64,
    /// Maximum number of live trucks.
    pub truck_cap: usize,

    // Session
    /// Whether spoken notifications start enabled.
    pub voice_on: bool,
    /// Whether disruptions move the map view automatically.
    pub auto_zoom_on: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            events_path: EVENTS_WS_PATH.to_string(),
            command_path: COMMAND_PATH.to_string(),
            health_path: HEALTH_PATH.to_string(),
            scenario_path: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            health_check: None,
            keepalive_interval_secs: None,
            animation_frame_ms: DEFAULT_ANIMATION_FRAME_MS,
            truck_speed: DEFAULT_TRUCK_SPEED,
            truck_cap: DEFAULT_TRUCK_CAP,
            voice_on: false,
            auto_zoom_on: true,
        }
    }
}

impl ClientConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::Configuration`] naming the first offending field.
    pub fn validate(&self) -> TwinResult<()> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(TwinError::Configuration(format!(
                "backend_url must start with http:// or https:// (got {:?})",
                self.backend_url
            )));
        }
        let paths = [
            ("events_path", Some(&self.events_path)),
            ("command_path", Some(&self.command_path)),
            ("health_path", Some(&self.health_path)),
            ("scenario_path", self.scenario_path.as_ref()),
        ];
        for (name, path) in paths {
            if let Some(path) = path {
                if !path.starts_with('/') {
                    return Err(TwinError::Configuration(format!(
                        "{name} must start with '/' (got {path:?})"
                    )));
                }
            }
        }
        if self.reconnect_delay_ms == 0 {
            return Err(TwinError::Configuration(
                "reconnect_delay_ms must be >= 1".to_string(),
            ));
        }
        if let Some(check) = &self.health_check {
            if check.max_attempts == 0 {
                return Err(TwinError::Configuration(
                    "health_check.max_attempts must be >= 1".to_string(),
                ));
            }
        }
        if self.keepalive_interval_secs == Some(0) {
            return Err(TwinError::Configuration(
                "keepalive_interval_secs must be >= 1".to_string(),
            ));
        }
        if self.animation_frame_ms == 0 {
            return Err(TwinError::Configuration(
                "animation_frame_ms must be >= 1".to_string(),
            ));
        }
        if !self.truck_speed.is_finite() || self.truck_speed <= 0.0 {
            return Err(TwinError::Configuration(
                "truck_speed must be a positive number".to_string(),
            ));
        }
        if self.truck_cap == 0 {
            return Err(TwinError::Configuration("truck_cap must be >= 1".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    #[must_use]
    pub fn animation_frame(&self) -> Duration {
        Duration::from_millis(self.animation_frame_ms)
    }

    #[must_use]
    pub fn keepalive_interval(&self) -> Option<Duration> {
        self.keepalive_interval_secs.map(Duration::from_secs)
    }

    /// Returns a `UrlBuilder` for the configured backend.
    #[must_use]
    pub fn urls(&self) -> UrlBuilder {
        UrlBuilder::new(&self.backend_url)
            .with_events_path(&self.events_path)
            .with_command_path(&self.command_path)
            .with_health_path(&self.health_path)
            .with_scenario_path(self.scenario_path.as_deref())
    }
}

/// Builder for the backend URLs the client talks to.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: String,
    events_path: String,
    command_path: String,
    health_path: String,
    scenario_path: Option<String>,
}

impl UrlBuilder {
    /// Creates a builder with the default endpoint paths.
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            events_path: EVENTS_WS_PATH.to_string(),
            command_path: COMMAND_PATH.to_string(),
            health_path: HEALTH_PATH.to_string(),
            scenario_path: None,
        }
    }

    #[must_use]
    pub fn with_events_path(mut self, path: &str) -> Self {
        self.events_path = path.to_string();
        self
    }

    #[must_use]
    pub fn with_command_path(mut self, path: &str) -> Self {
        self.command_path = path.to_string();
        self
    }

    #[must_use]
    pub fn with_health_path(mut self, path: &str) -> Self {
        self.health_path = path.to_string();
        self
    }

    #[must_use]
    pub fn with_scenario_path(mut self, path: Option<&str>) -> Self {
        self.scenario_path = path.map(str::to_string);
        self
    }

    /// Returns the base HTTP URL (e.g., `http://localhost:8000`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Returns the WebSocket URL of the event feed.
    ///
    /// `http` becomes `ws` and `https` becomes `wss`.
    #[must_use]
    pub fn events_url(&self) -> String {
        let ws_base = match self.base.strip_prefix("http") {
            Some(rest) => format!("ws{rest}"),
            None => self.base.clone(),
        };
        format!("{}{}", ws_base, self.events_path)
    }

    #[must_use]
    pub fn command_url(&self) -> String {
        format!("{}{}", self.base, self.command_path)
    }

    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base, self.health_path)
    }

    /// Returns the scenario URL, if a scenario endpoint is configured.
    #[must_use]
    pub fn scenario_url(&self) -> Option<String> {
        self.scenario_path
            .as_ref()
            .map(|path| format!("{}{}", self.base, path))
    }
}
