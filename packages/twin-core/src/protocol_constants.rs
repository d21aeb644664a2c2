//! Backend protocol constants and client defaults.
//!
//! Endpoint paths are fixed by the backend; the timing values are only the
//! defaults used when [`ClientConfig`](crate::config::ClientConfig) does not
//! override them.

// ─────────────────────────────────────────────────────────────────────────────
// Backend Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Default backend base URL (HTTP; the feed URL is derived from it).
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Server→client event stream (WebSocket, JSON text frames).
pub const EVENTS_WS_PATH: &str = "/events/ws";

/// Free-text command endpoint (`POST {"text": ...}`).
pub const COMMAND_PATH: &str = "/command";

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/healthz";

/// Scenario bootstrap endpoint (only served by some backends).
pub const SCENARIO_PATH: &str = "/api/scenario";

// ─────────────────────────────────────────────────────────────────────────────
// Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Delay before reconnecting after the feed closes (milliseconds).
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1500;

/// Health check attempts before giving up on a cold-starting backend.
pub const DEFAULT_HEALTH_CHECK_ATTEMPTS: u32 = 20;

/// Spacing between health check attempts (milliseconds).
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5000;

/// Timeout for command/health/scenario HTTP requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Animation frame interval (milliseconds), roughly 30 fps.
pub const DEFAULT_ANIMATION_FRAME_MS: u64 = 33;

// ─────────────────────────────────────────────────────────────────────────────
// Trucks
// ─────────────────────────────────────────────────────────────────────────────

/// Fraction of a route a truck covers per second.
pub const DEFAULT_TRUCK_SPEED: f64 = 0.05;

/// Maximum number of live trucks kept by the fleet.
pub const DEFAULT_TRUCK_CAP: usize = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

/// Notification shown when a command could not reach the backend.
pub const BACKEND_UNREACHABLE_MESSAGE: &str = "backend unreachable";
