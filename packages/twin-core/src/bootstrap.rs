//! Client bootstrap and dependency wiring.
//!
//! This module is the composition root: the single place where the feed,
//! dispatcher, command sender and background loops are instantiated and
//! wired to the front-end's map, notification and speech adapters.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::CommandSender;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState, FeedTransport, WsTransport};
use crate::dispatcher::EventDispatcher;
use crate::error::TwinResult;
use crate::health::{HealthCheck, HttpHealthCheck, KeepAlive};
use crate::map::MapAdapter;
use crate::notify::{NotificationSink, Speaker};
use crate::scenario::load_scenario;
use crate::session::Session;
use crate::stats::PredictiveStats;
use crate::trucks::{AnimationLoop, SharedFleet, TruckFleet};
use crate::utils::build_http_client;

/// Front-end capabilities the client renders through.
#[derive(Clone)]
pub struct ClientAdapters {
    pub map: Arc<dyn MapAdapter>,
    pub sink: Arc<dyn NotificationSink>,
    pub speaker: Arc<dyn Speaker>,
}

/// A running client: handles for the UI plus the background tasks.
pub struct TwinClient {
    /// User-togglable flags.
    pub session: Arc<Session>,
    /// Submits free-text commands.
    pub commands: CommandSender,
    /// Live trucks (shared with the animation loop).
    pub fleet: SharedFleet,
    /// Cancels every background task.
    pub cancel_token: CancellationToken,
    state: watch::Receiver<ConnectionState>,
    feed: Option<JoinHandle<TwinResult<()>>>,
    background: Vec<JoinHandle<()>>,
}

impl TwinClient {
    /// Subscribes to feed connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Resolves when the feed task stops on its own (health check gave up).
    ///
    /// Cancel-safe; pending forever once the feed task has been reaped.
    pub async fn feed_finished(&mut self) -> TwinResult<()> {
        let Some(handle) = self.feed.as_mut() else {
            return std::future::pending().await;
        };
        let joined = handle.await;
        self.feed = None;
        match joined {
            Ok(result) => result,
            Err(e) => {
                log::error!("[Bootstrap] Feed task failed: {}", e);
                Ok(())
            }
        }
    }

    /// Cancels all background tasks and waits for them to stop.
    pub async fn shutdown(mut self) -> TwinResult<()> {
        log::info!("[Bootstrap] Beginning graceful shutdown...");
        self.cancel_token.cancel();

        let result = match self.feed.take() {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("[Bootstrap] Feed task failed: {}", e);
                    Ok(())
                }
            },
            None => Ok(()),
        };
        for handle in self.background.drain(..) {
            if let Err(e) = handle.await {
                log::error!("[Bootstrap] Background task failed: {}", e);
            }
        }

        log::info!("[Bootstrap] Shutdown complete");
        result
    }
}

/// Bootstraps the client against the backend's WebSocket feed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the HTTP client
/// cannot be built.
pub async fn bootstrap_client(
    config: &ClientConfig,
    adapters: ClientAdapters,
) -> TwinResult<TwinClient> {
    bootstrap_client_with_transport(config, adapters, Arc::new(WsTransport)).await
}

/// Bootstraps the client with an explicit feed transport.
///
/// Wiring order:
///
/// 1. Shared infrastructure (HTTP client, cancellation token, session)
/// 2. Scenario seed (geography, static layers, stats baseline, seed trucks)
/// 3. Dispatcher and connection manager (optionally behind a health check)
/// 4. Animation and keep-alive loops
///
/// Must be called from within a tokio runtime.
pub async fn bootstrap_client_with_transport(
    config: &ClientConfig,
    adapters: ClientAdapters,
    transport: Arc<dyn FeedTransport>,
) -> TwinResult<TwinClient> {
    config.validate()?;

    let http_client = build_http_client()?;
    let urls = config.urls();
    let cancel_token = CancellationToken::new();
    let session = Arc::new(Session::from_config(config));
    let fleet: SharedFleet = Arc::new(Mutex::new(TruckFleet::new(
        config.truck_cap,
        config.truck_speed,
    )));

    let scenario_url = urls.scenario_url();
    let scenario = load_scenario(&http_client, scenario_url.as_deref()).await;
    let seeded = scenario.apply(adapters.map.as_ref(), &fleet);

    let dispatcher = EventDispatcher::new(
        Arc::new(seeded.geo),
        Arc::clone(&adapters.map),
        Arc::clone(&adapters.sink),
        Arc::clone(&adapters.speaker),
        Arc::clone(&session),
    )
    .with_stats(PredictiveStats::new(seeded.baseline))
    .with_fleet(Arc::clone(&fleet));

    let health: Arc<dyn HealthCheck> =
        Arc::new(HttpHealthCheck::new(http_client.clone(), urls.health_url()));

    let mut manager = ConnectionManager::new(
        urls.events_url(),
        transport,
        dispatcher,
        Arc::clone(&adapters.sink),
        config.reconnect_delay(),
    );
    if let Some(check) = config.health_check.clone() {
        manager = manager.with_health_check(Arc::clone(&health), check);
    }
    let state = manager.state();

    let feed = tokio::spawn({
        let cancel = cancel_token.clone();
        async move { manager.run(cancel).await }
    });

    let mut background = Vec::new();
    background.push(tokio::spawn(
        AnimationLoop::new(
            Arc::clone(&fleet),
            Arc::clone(&adapters.map),
            config.animation_frame(),
        )
        .run(cancel_token.clone()),
    ));
    if let Some(period) = config.keepalive_interval() {
        log::info!("[Bootstrap] Keep-alive every {:?}", period);
        background.push(tokio::spawn(
            KeepAlive::new(health, period).run(cancel_token.clone()),
        ));
    }

    let commands = CommandSender::new(http_client, urls.command_url(), adapters.sink);

    log::info!("[Bootstrap] Client started against {}", urls.base_url());
    Ok(TwinClient {
        session,
        commands,
        fleet,
        cancel_token,
        state,
        feed: Some(feed),
        background,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutcome;
    use crate::config::HealthCheckConfig;
    use crate::error::TwinError;
    use crate::map::{Layer, RecordingMapAdapter};
    use crate::notify::{RecordingNotificationSink, RecordingSpeaker};
    use axum::extract::ws::{Message, WebSocketUpgrade};
    use axum::routing::{get, post};
    use axum::Router;
    use std::time::Duration;

    struct Recorders {
        map: Arc<RecordingMapAdapter>,
        sink: Arc<RecordingNotificationSink>,
        speaker: Arc<RecordingSpeaker>,
    }

    impl Recorders {
        fn new() -> Self {
            Self {
                map: Arc::new(RecordingMapAdapter::new()),
                sink: Arc::new(RecordingNotificationSink::new()),
                speaker: Arc::new(RecordingSpeaker::new()),
            }
        }

        fn adapters(&self) -> ClientAdapters {
            ClientAdapters {
                map: self.map.clone(),
                sink: self.sink.clone(),
                speaker: self.speaker.clone(),
            }
        }

        fn has_text(&self, text: &str) -> bool {
            self.sink.notifications().iter().any(|n| n.text() == text)
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..250 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not met within 5s");
    }

    fn unused_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn fake_backend() -> String {
        let app = Router::new()
            .route(
                "/events/ws",
                get(|ws: WebSocketUpgrade| async move {
                    ws.on_upgrade(|mut socket| async move {
                        let frame = r#"{"type":"disruption","seq":1,"payload":{"a":"WH1","b":"WH4"}}"#;
                        let _ = socket.send(Message::Text(frame.into())).await;
                        // hold the connection open until the client leaves
                        while let Some(Ok(_)) = socket.recv().await {}
                    })
                }),
            )
            .route("/command", post(|| async { "ok" }))
            .route("/healthz", get(|| async { "ok" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn end_to_end_against_fake_backend() {
        let config = ClientConfig {
            backend_url: fake_backend().await,
            health_check: Some(HealthCheckConfig::default()),
            ..ClientConfig::default()
        };
        let rec = Recorders::new();

        let client = bootstrap_client(&config, rec.adapters()).await.unwrap();
        assert_eq!(rec.map.feature_count(Layer::Warehouses), 3);

        eventually(|| rec.has_text("Disruption on WH1 → WH4")).await;
        assert!(rec.has_text("Live feed connected"));
        assert_eq!(*client.state().borrow(), ConnectionState::Open);
        assert_eq!(rec.map.feature_count(Layer::Alert), 1);

        assert_eq!(client.commands.send("Fix").await, CommandOutcome::Sent);
        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unhealthy_backend_finishes_feed_with_error() {
        let config = ClientConfig {
            backend_url: format!("http://127.0.0.1:{}", unused_port()),
            health_check: Some(HealthCheckConfig {
                max_attempts: 1,
                interval_ms: 10,
            }),
            ..ClientConfig::default()
        };
        let rec = Recorders::new();

        let mut client = bootstrap_client(&config, rec.adapters()).await.unwrap();
        let err = client.feed_finished().await.unwrap_err();
        assert!(matches!(err, TwinError::BackendUnavailable { attempts: 1 }));

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = ClientConfig {
            truck_cap: 0,
            ..ClientConfig::default()
        };
        let err = bootstrap_client(&config, Recorders::new().adapters())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TwinError::Configuration(_)));
    }
}
