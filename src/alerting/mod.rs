//! StatusAlerter - decides when to notify about a unit's snapshot
//!
//! Each call to [`StatusAlerter::handle`] runs two passes:
//!
//! 1. **Single-event alerting**: edge-triggered notifications per
//!    (unit, measurement key), deduplicated through an [`AlertStateStore`].
//! 2. **Combined alerting**: a full rollup of all current snapshots, sent as
//!    one batch.
//!
//! ## Single-event state machine
//!
//! ```text
//! severity   record          → action
//! INFO       none            → nothing
//! INFO       WARN/ERROR      → recovery: notify, remove record
//! WARN/ERROR none            → change: notify, insert record
//! WARN/ERROR other severity  → change: notify, replace record
//! WARN/ERROR same severity   → nothing
//! ```
//!
//! Records are only written after every notification of the batch has been
//! dispatched.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, trace};

use crate::notify::Notifier;
use crate::{Measurement, StatusSnapshot, Unit};

pub mod combined;
pub mod state;

pub use combined::{CombinedLine, SeverityAggregator};
pub use state::{AlertKey, AlertStateStore, InMemoryAlertStore};

/// Measurements of one snapshot that need a notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertPlan {
    /// Back to INFO after an active alert
    pub recoveries: Vec<Measurement>,

    /// New alert or a different severity than last notified
    pub changes: Vec<Measurement>,
}

impl AlertPlan {
    pub fn is_empty(&self) -> bool {
        self.recoveries.is_empty() && self.changes.is_empty()
    }
}

pub struct StatusAlerter {
    notifiers: Vec<Arc<dyn Notifier>>,
    store: Arc<dyn AlertStateStore>,
    aggregator: SeverityAggregator,
}

impl StatusAlerter {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self::with_store(
            notifiers,
            Arc::new(InMemoryAlertStore::new()),
            SeverityAggregator::default(),
        )
    }

    pub fn with_store(
        notifiers: Vec<Arc<dyn Notifier>>,
        store: Arc<dyn AlertStateStore>,
        aggregator: SeverityAggregator,
    ) -> Self {
        Self {
            notifiers,
            store,
            aggregator,
        }
    }

    /// Handle a fresh snapshot of `unit`.
    ///
    /// `current` is the latest snapshot of every unit, including this one.
    #[instrument(skip_all, fields(unit = %unit))]
    pub async fn handle(
        &self,
        unit: &Unit,
        snapshot: &StatusSnapshot,
        current: &HashMap<Unit, StatusSnapshot>,
    ) {
        self.handle_single_event_alerting(unit, snapshot).await;
        self.handle_combined_alerting(current).await;
    }

    /// Work out which measurements need a notification, without side effects.
    pub fn plan(&self, unit: &Unit, snapshot: &StatusSnapshot) -> AlertPlan {
        let mut plan = AlertPlan::default();

        for measurement in &snapshot.measurements {
            let last = self.store.get(&AlertKey::new(unit, &measurement.key));

            if measurement.status.is_info() {
                if last.is_some() {
                    plan.recoveries.push(measurement.clone());
                }
            } else if last != Some(measurement.status) {
                plan.changes.push(measurement.clone());
            }
        }

        plan
    }

    pub async fn handle_single_event_alerting(&self, unit: &Unit, snapshot: &StatusSnapshot) -> AlertPlan {
        let plan = self.plan(unit, snapshot);

        if plan.is_empty() {
            trace!("no alert state changes");
            return plan;
        }

        debug!(
            "{} recoveries, {} changes",
            plan.recoveries.len(),
            plan.changes.len()
        );

        for measurement in plan.recoveries.iter().chain(&plan.changes) {
            self.dispatch(unit, measurement).await;
        }

        for measurement in &plan.recoveries {
            self.store.remove(&AlertKey::new(unit, &measurement.key));
        }
        for measurement in &plan.changes {
            self.store
                .put(AlertKey::new(unit, &measurement.key), measurement.status);
        }

        plan
    }

    pub async fn handle_combined_alerting(
        &self,
        current: &HashMap<Unit, StatusSnapshot>,
    ) -> Vec<CombinedLine> {
        let lines = self.aggregator.aggregate(current);
        trace!("sending {} combined lines", lines.len());

        join_all(
            self.notifiers
                .iter()
                .map(|notifier| notifier.combined_status_alerting(&lines)),
        )
        .await;

        lines
    }

    async fn dispatch(&self, unit: &Unit, measurement: &Measurement) {
        debug!(
            "{}: notifying {} ({})",
            unit, measurement.key, measurement.status
        );

        join_all(
            self.notifiers
                .iter()
                .map(|notifier| notifier.alert_about_status(unit, measurement)),
        )
        .await;
    }
}
