//! ProbeActor - turns HTTP health checks into success/failure ticks
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → HTTP request → Validate response → RateSensor tick
//!     ↑
//!     └─── Commands (ProbeNow, Shutdown)
//! ```
//!
//! A probe succeeds when the status code is expected (any 2xx unless
//! configured) and the body matches the configured pattern, if any.
//! Transport errors count as failures. With an [`EventCounter`] attached,
//! every outcome is also counted as an audit event and failures are logged.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, instrument, trace, warn};

use crate::config::{HttpMethod, ProbeConfig};
use crate::sensors::{AuditEvent, EventCounter, RateSensor, SensorKey};
use crate::{Error, Result};

use super::messages::ProbeCommand;

pub struct ProbeActor {
    config: ProbeConfig,

    /// HTTP client (reused across requests)
    client: reqwest::Client,

    body_pattern: Option<Regex>,

    /// Window receiving this probe's ticks
    sensor: Arc<RateSensor>,

    key: SensorKey,

    events: Option<Arc<EventCounter>>,

    command_rx: mpsc::Receiver<ProbeCommand>,

    interval_duration: Duration,
}

impl ProbeActor {
    pub fn new(
        config: ProbeConfig,
        sensor: Arc<RateSensor>,
        command_rx: mpsc::Receiver<ProbeCommand>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout as u64))
            .build()?;

        let body_pattern = config
            .body_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::InvalidConfig(format!("probe {}: {e}", config.name)))?;

        let key = SensorKey {
            key: config.sensor_key(),
            description: config.description.clone(),
        };

        Ok(Self {
            interval_duration: Duration::from_secs(config.interval as u64),
            config,
            client,
            body_pattern,
            sensor,
            key,
            events: None,
            command_rx,
        })
    }

    pub fn with_events(mut self, events: Arc<EventCounter>) -> Self {
        self.events = Some(events);
        self
    }

    #[instrument(skip(self), fields(probe = %self.config.name))]
    pub async fn run(mut self) {
        debug!("starting probe actor");

        let mut ticker = interval(self.interval_duration);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        ProbeCommand::ProbeNow { respond_to } => {
                            debug!("received ProbeNow command");
                            let success = self.probe().await;
                            let _ = respond_to.send(success);
                        }

                        ProbeCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("probe actor stopped");
    }

    async fn probe(&self) -> bool {
        let outcome = match self.execute_request().await {
            Ok((status_code, body)) => self.evaluate_response(status_code, &body),
            Err(e) => {
                warn!("probe request failed: {:#}", e);
                Err(e)
            }
        };

        let success = outcome.is_ok();
        if success {
            self.sensor.record_success(&self.key);
        } else {
            self.sensor.record_failure(&self.key);
        }

        if let Some(events) = &self.events {
            let name = format!(
                "{}.{}",
                self.key.key,
                if success { "success" } else { "failure" }
            );
            match &outcome {
                Ok(()) => events.tick(&AuditEvent::new("probe", name)),
                Err(e) => events.tick_and_log_error(&AuditEvent::new("probe", name), e),
            }
        }

        trace!("{} -> {}", self.config.url, if success { "success" } else { "failure" });
        success
    }

    /// Returns (status_code, body)
    async fn execute_request(&self) -> anyhow::Result<(u16, String)> {
        let method = match self.config.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let response = self
            .client
            .request(method, &self.config.url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status_code = response.status().as_u16();

        let body = if self.config.method == HttpMethod::Head {
            String::new()
        } else {
            response
                .text()
                .await
                .context("Failed to read response body")?
        };

        Ok((status_code, body))
    }

    fn evaluate_response(&self, status_code: u16, body: &str) -> anyhow::Result<()> {
        let status_ok = match &self.config.expected_status {
            Some(expected) => expected.contains(&status_code),
            None => (200..300).contains(&status_code),
        };

        if !status_ok {
            debug!("unexpected status code {status_code}");
            anyhow::bail!("unexpected status code {status_code}");
        }

        match &self.body_pattern {
            Some(pattern) if !pattern.is_match(body) => {
                debug!("body does not match {}", pattern.as_str());
                anyhow::bail!("body does not match {}", pattern.as_str())
            }
            _ => Ok(()),
        }
    }
}

/// Handle for controlling a ProbeActor
#[derive(Clone)]
pub struct ProbeHandle {
    sender: mpsc::Sender<ProbeCommand>,
}

impl ProbeHandle {
    /// Spawn a probe recording its outcomes on `sensor`
    pub fn spawn(config: ProbeConfig, sensor: Arc<RateSensor>) -> Result<Self> {
        Self::spawn_with_events(config, sensor, None)
    }

    /// Spawn a probe that also counts its outcomes on `events`
    pub fn spawn_with_events(
        config: ProbeConfig,
        sensor: Arc<RateSensor>,
        events: Option<Arc<EventCounter>>,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let mut actor = ProbeActor::new(config, sensor, cmd_rx)?;
        if let Some(events) = events {
            actor = actor.with_events(events);
        }
        tokio::spawn(actor.run());

        Ok(Self { sender: cmd_tx })
    }

    /// Probe now; returns whether the probe succeeded
    pub async fn probe_now(&self) -> anyhow::Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ProbeCommand::ProbeNow { respond_to: tx })
            .await
            .map_err(|_| anyhow::anyhow!("probe actor not running"))?;

        rx.await
            .map_err(|_| anyhow::anyhow!("probe actor dropped response"))
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender
            .send(ProbeCommand::Shutdown)
            .await
            .map_err(|_| anyhow::anyhow!("probe actor not running"))
    }
}
