//! Notification system: the log/chat panel, the dashboard and speech.
//!
//! This module provides:
//! - [`NotificationSink`] trait for everything the user reads
//! - [`Speaker`] trait for everything the user hears
//! - [`BroadcastNotificationBridge`] for fanning notifications out to UIs
//!
//! All of these are independent of network state; the dispatcher and the
//! connection manager only ever see the traits.

mod bridge;
mod sink;
mod speaker;

pub use bridge::BroadcastNotificationBridge;
pub use sink::{
    LoggingNotificationSink, NoopNotificationSink, NotificationSink, RecordingNotificationSink,
};
pub use speaker::{LoggingSpeaker, NoopSpeaker, RecordingSpeaker, Speaker};

use std::sync::Arc;

use serde::Serialize;

use crate::stats::StatsTable;
use crate::utils::now_millis;

/// A single entry for the log/chat panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    /// One-line status entry (connection state, failures).
    Log {
        text: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Chat bubble describing an applied event.
    Chat {
        text: String,
        /// Choices the user can pick; picking one re-submits it as a command.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        options: Vec<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl Notification {
    pub fn log(text: impl Into<String>) -> Self {
        Self::Log {
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat {
            text: text.into(),
            options: Vec::new(),
            timestamp: now_millis(),
        }
    }

    pub fn chat_with_options(text: impl Into<String>, options: Vec<String>) -> Self {
        Self::Chat {
            text: text.into(),
            options,
            timestamp: now_millis(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Log { text, .. } | Self::Chat { text, .. } => text,
        }
    }

    /// Actionable options (empty for log entries).
    pub fn options(&self) -> &[String] {
        match self {
            Self::Log { .. } => &[],
            Self::Chat { options, .. } => options,
        }
    }
}

/// Events fanned out to UI subscribers.
#[derive(Debug, Clone)]
pub enum BroadcastEvent {
    /// A log entry or chat bubble.
    Notification(Notification),
    /// The predictive stats table was replaced.
    Dashboard(Arc<StatsTable>),
}

impl From<Notification> for BroadcastEvent {
    fn from(notification: Notification) -> Self {
        BroadcastEvent::Notification(notification)
    }
}

impl From<Arc<StatsTable>> for BroadcastEvent {
    fn from(table: Arc<StatsTable>) -> Self {
        BroadcastEvent::Dashboard(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_options_are_exposed() {
        let n =
            Notification::chat_with_options("Which route?", vec!["Fix".into(), "Reroute".into()]);
        assert_eq!(n.text(), "Which route?");
        assert_eq!(n.options(), ["Fix".to_string(), "Reroute".to_string()]);
        assert!(Notification::log("feed open").options().is_empty());
    }

    #[test]
    fn notification_serializes_with_kind_tag() {
        let n = Notification::Log {
            text: "backend unreachable".into(),
            timestamp: 7,
        };
        assert_eq!(
            serde_json::to_value(&n).unwrap(),
            json!({"kind": "log", "text": "backend unreachable", "timestamp": 7})
        );
    }
}
