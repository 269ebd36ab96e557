//! ReporterActor - periodic report cycle of one unit
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → Measure sensors → StatusSnapshot → StatusBoard → StatusAlerter
//!     ↑
//!     └─── Commands (ReportNow, Shutdown)
//! ```
//!
//! A sensor that fails is logged and left out of the cycle; the remaining
//! sensors still report. The alerter's combined pass must not run
//! concurrently with itself, so an alerter should be driven by one reporter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at};
use tracing::{debug, instrument, trace, warn};

use crate::alerting::StatusAlerter;
use crate::board::StatusBoard;
use crate::sensors::Sensor;
use crate::{Measurement, StatusSnapshot, Unit};

use super::messages::ReporterCommand;

pub struct ReporterActor {
    unit: Unit,

    sensors: Vec<Arc<dyn Sensor>>,

    /// Latest snapshot of every unit
    board: Arc<StatusBoard>,

    alerter: Arc<StatusAlerter>,

    command_rx: mpsc::Receiver<ReporterCommand>,

    interval_duration: Duration,
}

impl ReporterActor {
    pub fn new(
        unit: Unit,
        interval_duration: Duration,
        sensors: Vec<Arc<dyn Sensor>>,
        board: Arc<StatusBoard>,
        alerter: Arc<StatusAlerter>,
        command_rx: mpsc::Receiver<ReporterCommand>,
    ) -> Self {
        Self {
            unit,
            sensors,
            board,
            alerter,
            command_rx,
            interval_duration,
        }
    }

    /// Run the actor's main loop
    ///
    /// The first cycle runs one interval after start.
    #[instrument(skip(self), fields(unit = %self.unit))]
    pub async fn run(mut self) {
        debug!("starting reporter actor");

        let mut ticker = interval_at(
            Instant::now() + self.interval_duration,
            self.interval_duration,
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        ReporterCommand::ReportNow { respond_to } => {
                            debug!("received ReportNow command");
                            let snapshot = self.report().await;
                            let _ = respond_to.send(snapshot);
                        }

                        ReporterCommand::Shutdown => {
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

        debug!("reporter actor stopped");
    }

    async fn report(&self) -> StatusSnapshot {
        let started = std::time::Instant::now();
        let measurements = self.collect_measurements();
        let measured_in = started.elapsed();

        let snapshot = StatusSnapshot::new(self.unit.clone(), measurements, Utc::now());
        self.board.publish(snapshot.clone());

        let current = self.board.current();
        self.alerter.handle(&self.unit, &snapshot, &current).await;

        debug!(
            "reported {} measurements (measuring took {}ms, alerting took {}ms)",
            snapshot.measurements.len(),
            measured_in.as_millis(),
            (started.elapsed() - measured_in).as_millis()
        );

        snapshot
    }

    fn collect_measurements(&self) -> Vec<Measurement> {
        self.sensors
            .iter()
            .flat_map(|sensor| match sensor.measure() {
                Ok(measurements) => {
                    trace!("{}: {} measurements", sensor.name(), measurements.len());
                    measurements
                }
                Err(e) => {
                    warn!("sensor {} failed, skipping it this cycle: {e}", sensor.name());
                    vec![]
                }
            })
            .collect()
    }
}

/// Handle for controlling a ReporterActor
#[derive(Clone)]
pub struct ReporterHandle {
    sender: mpsc::Sender<ReporterCommand>,
}

impl ReporterHandle {
    /// Spawn a new reporter actor for `unit`
    pub fn spawn(
        unit: Unit,
        interval_duration: Duration,
        sensors: Vec<Arc<dyn Sensor>>,
        board: Arc<StatusBoard>,
        alerter: Arc<StatusAlerter>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = ReporterActor::new(unit, interval_duration, sensors, board, alerter, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a report cycle now and return the produced snapshot
    pub async fn report_now(&self) -> anyhow::Result<StatusSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReporterCommand::ReportNow { respond_to: tx })
            .await
            .map_err(|_| anyhow::anyhow!("reporter actor not running"))?;

        rx.await
            .map_err(|_| anyhow::anyhow!("reporter actor dropped response"))
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender
            .send(ReporterCommand::Shutdown)
            .await
            .map_err(|_| anyhow::anyhow!("reporter actor not running"))
    }
}
