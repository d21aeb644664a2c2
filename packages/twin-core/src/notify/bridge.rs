//! Bridge that fans notifications out to any number of UI subscribers.
//!
//! The [`BroadcastNotificationBridge`] sits between the core (which only sees
//! a [`NotificationSink`]) and front-ends that want a stream of
//! [`BroadcastEvent`]s, such as the terminal client's printer task.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::sink::NotificationSink;
use super::{BroadcastEvent, Notification};
use crate::stats::StatsTable;

/// Bridges notifications to a broadcast channel.
///
/// Also forwards to an optional external sink that can be set after
/// construction (e.g. a logging sink while debugging).
///
/// # Thread Safety
///
/// The bridge is `Send + Sync` and can be shared across async tasks.
/// The external sink uses `RwLock` to allow setting it after construction.
#[derive(Clone)]
pub struct BroadcastNotificationBridge {
    tx: broadcast::Sender<BroadcastEvent>,
    external_sink: Arc<RwLock<Option<Arc<dyn NotificationSink>>>>,
}

impl BroadcastNotificationBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external sink that receives everything before the broadcast.
    pub fn set_external_sink(&self, sink: Arc<dyn NotificationSink>) {
        *self.external_sink.write() = Some(sink);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: BroadcastEvent) {
        if let Err(e) = self.tx.send(event) {
            log::trace!("[NotifyBridge] No broadcast receivers: {}", e);
        }
    }
}

impl NotificationSink for BroadcastNotificationBridge {
    fn notify(&self, notification: Notification) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.notify(notification.clone());
        }
        self.send(notification.into());
    }

    fn render_dashboard(&self, table: Arc<StatsTable>) {
        if let Some(ref sink) = *self.external_sink.read() {
            sink.render_dashboard(Arc::clone(&table));
        }
        self.send(table.into());
    }
}
