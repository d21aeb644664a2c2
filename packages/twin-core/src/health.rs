//! Backend liveness checks: the start-up health check and the keep-alive ping.
//!
//! Both treat a non-2xx answer or a network failure as "not ready yet",
//! never as fatal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::HealthCheckConfig;
use crate::error::{TwinError, TwinResult};

/// Trait for asking the backend whether it is up.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Returns `true` if the backend answered with a 2xx status.
    async fn is_healthy(&self) -> bool;
}

/// `GET {health_url}` over HTTP.
pub struct HttpHealthCheck {
    client: Client,
    url: String,
}

impl HttpHealthCheck {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn is_healthy(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    log::debug!("[Health] {} answered {}", self.url, response.status());
                }
                ok
            }
            Err(e) => {
                log::debug!("[Health] {} unreachable: {}", self.url, e);
                false
            }
        }
    }
}

/// Polls `check` until it succeeds or the attempts run out.
///
/// Returns `Ok(())` once healthy, or immediately if `cancel` fires.
///
/// # Errors
///
/// Returns [`TwinError::BackendUnavailable`] when every attempt failed.
pub async fn wait_until_healthy(
    check: &dyn HealthCheck,
    config: &HealthCheckConfig,
    cancel: &CancellationToken,
) -> TwinResult<()> {
    for attempt in 1..=config.max_attempts {
        if check.is_healthy().await {
            log::info!("[Health] Backend healthy after {} attempt(s)", attempt);
            return Ok(());
        }
        log::info!(
            "[Health] Backend not ready (attempt {}/{})",
            attempt,
            config.max_attempts
        );
        if attempt < config.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(config.interval()) => {}
            }
        }
    }
    Err(TwinError::BackendUnavailable {
        attempts: config.max_attempts,
    })
}

/// Fixed-interval keep-alive ping. Results are ignored.
pub struct KeepAlive {
    check: Arc<dyn HealthCheck>,
    period: Duration,
}

impl KeepAlive {
    pub fn new(check: Arc<dyn HealthCheck>, period: Duration) -> Self {
        Self { check, period }
    }

    /// Runs until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick is immediate; the feed was just checked or opened
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let healthy = self.check.is_healthy().await;
                    log::trace!("[KeepAlive] ping healthy={}", healthy);
                }
            }
        }
    }
}
