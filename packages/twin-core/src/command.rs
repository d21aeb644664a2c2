//! Free-text command submission.

use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;

use crate::notify::{Notification, NotificationSink};
use crate::protocol_constants::BACKEND_UNREACHABLE_MESSAGE;

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The request reached the backend. Its answer arrives on the feed.
    Sent,
    /// Blank input; nothing was sent.
    Empty,
    /// The request failed in transport; a notification was emitted.
    Unreachable,
}

#[derive(Serialize)]
struct CommandBody<'a> {
    text: &'a str,
}

/// Posts user commands to the backend.
///
/// Fire-and-forget: no retry, no queueing, the response body is ignored.
#[derive(Clone)]
pub struct CommandSender {
    client: Client,
    url: String,
    sink: Arc<dyn NotificationSink>,
}

impl CommandSender {
    pub fn new(client: Client, url: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            client,
            url: url.into(),
            sink,
        }
    }

    /// Sends `text` after trimming it.
    pub async fn send(&self, text: &str) -> CommandOutcome {
        let text = text.trim();
        if text.is_empty() {
            return CommandOutcome::Empty;
        }

        log::info!("[Command] POST {} ({} chars)", self.url, text.len());
        match self
            .client
            .post(&self.url)
            .json(&CommandBody { text })
            .send()
            .await
        {
            Ok(response) => {
                log::debug!("[Command] Backend answered {}", response.status());
                CommandOutcome::Sent
            }
            Err(e) => {
                log::warn!("[Command] Failed to reach backend: {}", e);
                self.sink
                    .notify(Notification::log(BACKEND_UNREACHABLE_MESSAGE));
                CommandOutcome::Unreachable
            }
        }
    }
}
