//! EventCounter - audit events counted per report cycle
//!
//! Producers tick named events as they happen. Each `measure()` drains the
//! counts and reports one INFO measurement per event seen since the last
//! report, keyed `audit.<event name>`. Events that did not occur are not
//! reported.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::{Error, Measurement, MetricValue, Result, Severity, StandardUnit};

use super::Sensor;

/// What happened, grouped by a coarse type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub event_type: String,
    pub event_name: String,
}

impl AuditEvent {
    pub fn new(event_type: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_name: event_name.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventCounter {
    counts: Mutex<BTreeMap<String, f64>>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self, event: &AuditEvent) {
        self.tick_by(event, 1.0);
    }

    pub fn tick_by(&self, event: &AuditEvent, count: f64) {
        match self.counts.lock() {
            Ok(mut counts) => *counts.entry(event.event_name.clone()).or_default() += count,
            Err(e) => warn!("failed to count {}: {e}", event.event_name),
        }
    }

    /// Log the event with `details` and count it once
    pub fn tick_and_log(&self, event: &AuditEvent, details: &[&str]) {
        let details = details
            .iter()
            .map(|detail| format!("[{detail}]"))
            .collect::<Vec<_>>()
            .join(" - ");
        info!(
            "AUDIT EVENT - [{}] - [{}] - {details}",
            event.event_type, event.event_name
        );
        self.tick(event);
    }

    /// Log the event with the full error chain and count it once
    pub fn tick_and_log_error(&self, event: &AuditEvent, error: &anyhow::Error) {
        self.tick_and_log(event, &[&format!("{error:#}")]);
    }

    fn drain(&self) -> Result<BTreeMap<String, f64>> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|e| Error::Poisoned(e.to_string()))?;
        Ok(std::mem::take(&mut *counts))
    }
}

impl Sensor for EventCounter {
    fn name(&self) -> &str {
        "audit"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        Ok(self
            .drain()?
            .into_iter()
            .map(|(name, count)| {
                Measurement::new(
                    format!("audit.{name}"),
                    Severity::Info,
                    format!("Last minute: {count:?}"),
                )
                .with_metric(MetricValue::new(count, StandardUnit::Count))
            })
            .collect())
    }
}
