//! Periodic self-ping against our own `/health` endpoint.
//!
//! Some free hosting tiers idle a process that receives no HTTP traffic;
//! long polling Telegram does not count. Failures are logged and the loop
//! carries on.

use std::time::Duration;

use punchclock_core::config::KeepAliveConfig;
use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{error, info, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct KeepAlive {
    client: reqwest::Client,
    endpoint: String,
    interval: Duration,
    initial_delay: Duration,
}

impl KeepAlive {
    /// `None` when no public URL is configured.
    pub fn from_config(client: reqwest::Client, config: &KeepAliveConfig) -> Option<Self> {
        let base = config.url.as_deref()?.trim().trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        Some(Self {
            client,
            endpoint: format!("{base}/health"),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One GET against the health endpoint.
    pub async fn ping(&self) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(PING_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK {
            info!(endpoint = %self.endpoint, "keep-alive ping ok");
        } else {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "keep-alive ping returned non-200");
        }
        Ok(status)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            endpoint = %self.endpoint,
            interval_secs = self.interval.as_secs(),
            initial_delay_secs = self.initial_delay.as_secs(),
            "keep-alive started"
        );
        tokio::select! {
            _ = tokio::time::sleep(self.initial_delay) => {}
            _ = shutdown.changed() => return,
        }
        loop {
            if let Err(e) = self.ping().await {
                error!(endpoint = %self.endpoint, error = %e, "keep-alive ping failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("keep-alive stopped");
                    return;
                }
            }
        }
    }
}
