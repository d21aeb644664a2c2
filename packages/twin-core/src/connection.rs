//! Live event feed connection with fixed-delay reconnect.
//!
//! The [`ConnectionManager`] owns the single feed connection and the
//! [`EventDispatcher`]. It cycles `Connecting -> Open -> Closed -> Connecting`
//! until cancelled, waiting the same delay after every close. There is no
//! backoff growth and no attempt limit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::config::HealthCheckConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::TwinResult;
use crate::event::EventEnvelope;
use crate::health::{wait_until_healthy, HealthCheck};
use crate::notify::{Notification, NotificationSink};

/// Feed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Opens feed connections.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn connect(&self, url: &str) -> TwinResult<Box<dyn FeedStream>>;
}

/// An open feed connection.
#[async_trait]
pub trait FeedStream: Send {
    /// Next text frame, or `None` once the connection has closed.
    async fn next_text(&mut self) -> Option<TwinResult<String>>;
}

/// WebSocket transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self, url: &str) -> TwinResult<Box<dyn FeedStream>> {
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(WsFeedStream { socket }))
    }
}

struct WsFeedStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedStream for WsFeedStream {
    async fn next_text(&mut self) -> Option<TwinResult<String>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => log::warn!("[Feed] Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    log::debug!("[Feed] Close frame: {:?}", frame);
                    return None;
                }
                // ping/pong are answered by tungstenite
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Owns the feed connection and drives the dispatcher.
pub struct ConnectionManager {
    url: String,
    transport: Arc<dyn FeedTransport>,
    dispatcher: EventDispatcher,
    sink: Arc<dyn NotificationSink>,
    reconnect_delay: Duration,
    readiness: Option<(Arc<dyn HealthCheck>, HealthCheckConfig)>,
    state_tx: watch::Sender<ConnectionState>,
    connect_attempts: u64,
    /// Set on open, cleared by the first sequenced frame of that connection.
    awaiting_first_seq: bool,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        transport: Arc<dyn FeedTransport>,
        dispatcher: EventDispatcher,
        sink: Arc<dyn NotificationSink>,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            url: url.into(),
            transport,
            dispatcher,
            sink,
            reconnect_delay,
            readiness: None,
            state_tx,
            connect_attempts: 0,
            awaiting_first_seq: false,
        }
    }

    /// Polls `check` before the first connection attempt.
    #[must_use]
    pub fn with_health_check(mut self, check: Arc<dyn HealthCheck>, config: HealthCheckConfig) -> Self {
        self.readiness = Some((check, config));
        self
    }

    /// Subscribes to state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Runs the connect/reconnect cycle until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TwinError::BackendUnavailable`] if the health check is
    /// enabled and never succeeds. Once connected, errors are recovered by
    /// reconnecting and never returned.
    pub async fn run(&mut self, cancel: CancellationToken) -> TwinResult<()> {
        if let Some((check, config)) = self.readiness.clone() {
            wait_until_healthy(check.as_ref(), &config, &cancel).await?;
        }

        log::info!("[Feed] Connecting to {}", self.url);
        while !cancel.is_cancelled() {
            self.set_state(ConnectionState::Connecting);
            self.connect_attempts += 1;

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.transport.connect(&self.url) => result,
            };

            match connected {
                Ok(stream) => {
                    self.set_state(ConnectionState::Open);
                    log::info!("[Feed] Connected (attempt {})", self.connect_attempts);
                    self.sink.notify(Notification::log("Live feed connected"));
                    self.dispatcher.reset_stats();
                    self.awaiting_first_seq = true;

                    if self.pump(stream, &cancel).await {
                        break;
                    }
                    log::info!("[Feed] Connection closed");
                }
                Err(e) => {
                    log::warn!("[Feed] Connect failed: {}", e);
                }
            }

            self.set_state(ConnectionState::Closed);
            self.sink.notify(Notification::log(format!(
                "Live feed closed, reconnecting in {} ms",
                self.reconnect_delay.as_millis()
            )));

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Closed);
        log::info!("[Feed] Stopped");
        Ok(())
    }

    /// Dispatches frames until the stream ends. Returns `true` if cancelled.
    async fn pump(&mut self, mut stream: Box<dyn FeedStream>, cancel: &CancellationToken) -> bool {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return true,
                frame = stream.next_text() => frame,
            };
            match frame {
                Some(Ok(text)) => self.handle_frame(&text),
                Some(Err(e)) => {
                    log::warn!("[Feed] Transport error: {}", e);
                    return false;
                }
                None => return false,
            }
        }
    }

    fn handle_frame(&mut self, text: &str) {
        match EventEnvelope::from_json(text) {
            Ok(envelope) => {
                if let Some(seq) = envelope.seq {
                    self.check_sequence_restart(seq);
                }
                self.dispatcher.dispatch(&envelope);
            }
            Err(e) => log::warn!("[Feed] Dropping undecodable frame: {}", e),
        }
    }

    /// Warns when a new connection starts at or below the cursor, which
    /// means the backend restarted its in-memory sequence.
    fn check_sequence_restart(&mut self, seq: u64) {
        if !std::mem::take(&mut self.awaiting_first_seq) {
            return;
        }
        let cursor = self.dispatcher.cursor();
        if !cursor.is_behind(seq) {
            return;
        }
        let last = cursor.last().unwrap_or_default();
        log::warn!(
            "[Feed] Backend sequence restarted at {} (cursor {}), events are dropped until it passes {}",
            seq,
            last,
            last
        );
        self.sink.notify(Notification::log(format!(
            "Live feed sequence restarted at {seq}; updates paused until seq {}",
            last + 1
        )));
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}
