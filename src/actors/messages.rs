//! Message types for actor communication
//!
//! Every actor owns an mpsc command channel; request/response commands carry
//! a oneshot sender for the reply.

use tokio::sync::oneshot;

use crate::StatusSnapshot;

/// Commands that can be sent to a ReporterActor
#[derive(Debug)]
pub enum ReporterCommand {
    /// Run a report cycle immediately, bypassing the interval timer
    ReportNow {
        respond_to: oneshot::Sender<StatusSnapshot>,
    },

    /// Gracefully shut down the reporter
    Shutdown,
}

/// Commands that can be sent to a ProbeActor
#[derive(Debug)]
pub enum ProbeCommand {
    /// Probe immediately; responds with whether the probe succeeded
    ProbeNow {
        respond_to: oneshot::Sender<bool>,
    },

    /// Gracefully shut down the probe
    Shutdown,
}
