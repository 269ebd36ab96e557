//! Actors driving the core
//!
//! Each actor runs as an independent async task and is controlled through a
//! cloneable handle wrapping its mpsc command channel.
//!
//! ```text
//! ProbeActor ──record tick──▶ RateSensor ─┐
//!                        MemorySensor ────┼──▶ ReporterActor ──▶ StatusBoard
//!                          LoadSensor ────┘          │
//!                                                    ▼
//!                                             StatusAlerter ──▶ Notifiers
//! ```
//!
//! - **ReporterActor**: measures all sensors of a unit at a fixed interval,
//!   publishes the snapshot and runs alerting
//! - **ProbeActor**: requests an HTTP endpoint and records the outcome as a
//!   success/failure tick

pub mod messages;
pub mod probe;
pub mod reporter;
