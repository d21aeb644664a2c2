//! Notification sink abstraction for decoupling dispatch from the UI.
//!
//! The dispatcher and connection manager depend on the [`NotificationSink`]
//! trait rather than a concrete panel, enabling tests and alternative
//! front-ends.

use std::sync::Arc;

use parking_lot::Mutex;

use super::Notification;
use crate::stats::StatsTable;

/// Trait for rendering what the user reads.
pub trait NotificationSink: Send + Sync {
    /// Appends a log entry or chat bubble.
    fn notify(&self, notification: Notification);

    /// Re-renders the dashboard with a freshly swapped stats table.
    fn render_dashboard(&self, table: Arc<StatsTable>);
}

/// No-op sink. Notifications are silently discarded.
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn notify(&self, _notification: Notification) {}

    fn render_dashboard(&self, _table: Arc<StatsTable>) {}
}

/// Logging sink for debugging and development.
pub struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, notification: Notification) {
        tracing::info!(?notification, "notification");
    }

    fn render_dashboard(&self, table: Arc<StatsTable>) {
        tracing::debug!(locations = table.len(), "dashboard");
    }
}

/// In-memory sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingNotificationSink {
    notifications: Mutex<Vec<Notification>>,
    dashboards: Mutex<Vec<Arc<StatsTable>>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().len()
    }

    /// Text of the most recent notification.
    pub fn last_text(&self) -> Option<String> {
        self.notifications
            .lock()
            .last()
            .map(|n| n.text().to_string())
    }

    /// Number of dashboard re-renders.
    pub fn dashboard_renders(&self) -> usize {
        self.dashboards.lock().len()
    }

    pub fn last_dashboard(&self) -> Option<Arc<StatsTable>> {
        self.dashboards.lock().last().cloned()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }

    fn render_dashboard(&self, table: Arc<StatsTable>) {
        self.dashboards.lock().push(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingNotificationSink::new();
        sink.notify(Notification::log("feed open"));
        sink.notify(Notification::chat("Disruption on WH1 to WH4"));
        sink.render_dashboard(Arc::new(StatsTable::new()));

        assert_eq!(sink.notification_count(), 2);
        assert_eq!(sink.last_text().as_deref(), Some("Disruption on WH1 to WH4"));
        assert_eq!(sink.dashboard_renders(), 1);
    }
}
