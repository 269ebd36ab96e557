use std::sync::Mutex;

use async_trait::async_trait;

use crate::alerting::CombinedLine;
use crate::{Measurement, Unit};

use super::Notifier;

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
