//! Test helpers shared by the integration and property tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use watchpost::{
    Measurement, Severity, StatusSnapshot, Unit, alerting::CombinedLine, notify::Notifier,
};

pub fn measurement(key: &str, status: Severity, display_value: &str) -> Measurement {
    Measurement::new(key, status, display_value)
}

/// Snapshot of `unit` taken `age_secs` seconds ago
pub fn snapshot_aged(unit: &Unit, measurements: Vec<Measurement>, age_secs: i64) -> StatusSnapshot {
    StatusSnapshot::new(
        unit.clone(),
        measurements,
        Utc::now() - Duration::seconds(age_secs),
    )
}

pub fn snapshot(unit: &Unit, measurements: Vec<Measurement>) -> StatusSnapshot {
    snapshot_aged(unit, measurements, 0)
}

pub fn current(snapshots: &[StatusSnapshot]) -> HashMap<Unit, StatusSnapshot> {
    snapshots
        .iter()
        .map(|snapshot| (snapshot.unit.clone(), snapshot.clone()))
        .collect()
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    statuses: Mutex<Vec<(Unit, Measurement)>>,
    batches: Mutex<Vec<Vec<CombinedLine>>>,
}

impl RecordingNotifier {
    pub fn statuses(&self) -> Vec<(Unit, Measurement)> {
        self.statuses
            .lock()
            .map(|statuses| statuses.clone())
            .unwrap_or_default()
    }

    pub fn batches(&self) -> Vec<Vec<CombinedLine>> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn alert_about_status(&self, unit: &Unit, measurement: &Measurement) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.push((unit.clone(), measurement.clone()));
        }
    }

    async fn combined_status_alerting(&self, lines: &[CombinedLine]) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(lines.to_vec());
        }
    }
}
