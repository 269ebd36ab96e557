//! Integration tests for the alerting flow
//!
//! These tests verify that:
//! - Single-event alerting is deduplicated across cycles
//! - Recoveries are sent once and clear the alert
//! - The combined rollup groups servers of one component
//! - Stale snapshots are left out of the rollup
//! - The reporter drives both passes from live sensors

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use watchpost::{
    Severity, Unit,
    actors::reporter::ReporterHandle,
    alerting::{AlertStateStore, InMemoryAlertStore, SeverityAggregator, StatusAlerter},
    board::StatusBoard,
    sensors::{RateSensor, Sensor, SensorKey},
};

use crate::helpers::{RecordingNotifier, current, measurement, snapshot, snapshot_aged};

#[tokio::test]
async fn test_latency_escalation_and_recovery() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(InMemoryAlertStore::new());
    let alerter = StatusAlerter::with_store(
        vec![notifier.clone()],
        store.clone(),
        SeverityAggregator::default(),
    );

    let api_1 = Unit::new("api", "api-1");
    let api_2 = Unit::new("api", "api-2");

    // Cycle 1: api-1 is slow
    let slow = snapshot(&api_1, vec![measurement("latency", Severity::Error, "900ms")]);
    let fast = snapshot(&api_2, vec![measurement("latency", Severity::Info, "80ms")]);
    let statuses = current(&[slow.clone(), fast.clone()]);

    alerter.handle(&api_1, &slow, &statuses).await;
    alerter.handle(&api_2, &fast, &statuses).await;

    let sent = notifier.statuses();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, api_1);
    assert_eq!(sent[0].1.status, Severity::Error);
    assert_eq!(store.len(), 1);

    let batch = notifier.batches().pop().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].severity, Severity::Error);
    assert_eq!(batch[0].header, "latency @ api: 1 x error, 0 x warn, 1 x ok");
    assert_eq!(
        batch[0].body,
        "🟥 `api-1        ` _900ms_\n🟩 `api-2        ` _80ms_"
    );

    // Cycle 2: unchanged, no new single-event notification
    alerter.handle(&api_1, &slow, &statuses).await;
    assert_eq!(notifier.statuses().len(), 1);

    // Cycle 3: api-1 recovers
    let recovered = snapshot(&api_1, vec![measurement("latency", Severity::Info, "95ms")]);
    let statuses = current(&[recovered.clone(), fast]);
    alerter.handle(&api_1, &recovered, &statuses).await;

    let sent = notifier.statuses();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].1.status, Severity::Info);
    assert!(store.is_empty());
    assert!(notifier.batches().pop().unwrap().is_empty());

    // Cycle 4: still recovered, nothing more
    alerter.handle(&api_1, &recovered, &statuses).await;
    assert_eq!(notifier.statuses().len(), 2);
}

#[tokio::test]
async fn test_severity_change_replaces_alert() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(InMemoryAlertStore::new());
    let alerter = StatusAlerter::with_store(
        vec![notifier.clone()],
        store.clone(),
        SeverityAggregator::default(),
    );
    let unit = Unit::new("db", "db-1");

    for status in [Severity::Warn, Severity::Warn, Severity::Error, Severity::Error] {
        let snapshot = snapshot(&unit, vec![measurement("disk", status, "x")]);
        alerter.handle_single_event_alerting(&unit, &snapshot).await;
    }

    let statuses: Vec<_> = notifier
        .statuses()
        .into_iter()
        .map(|(_, m)| m.status)
        .collect();
    assert_eq!(statuses, vec![Severity::Warn, Severity::Error]);

    let key = watchpost::alerting::AlertKey::new(&unit, "disk");
    assert_eq!(store.get(&key), Some(Severity::Error));
}

#[tokio::test]
async fn test_stale_units_are_left_out_of_rollup() {
    let alerter = StatusAlerter::new(vec![]);

    let fresh_unit = Unit::new("worker", "worker-1");
    let stale_unit = Unit::new("worker", "worker-2");

    let statuses = current(&[
        snapshot(&fresh_unit, vec![measurement("queue", Severity::Warn, "120 jobs")]),
        snapshot_aged(
            &stale_unit,
            vec![measurement("queue", Severity::Error, "9000 jobs")],
            10 * 60,
        ),
    ]);

    let lines = alerter.handle_combined_alerting(&statuses).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].severity, Severity::Warn);
    assert_eq!(lines[0].header, "queue @ worker: 0 x error, 1 x warn, 0 x ok");
    assert!(!lines[0].body.contains("worker-2"));
}

#[tokio::test]
async fn test_components_are_grouped_apart() {
    let alerter = StatusAlerter::new(vec![]);

    let statuses = current(&[
        snapshot(
            &Unit::new("api", "host-1"),
            vec![measurement("mem.used", Severity::Warn, "90%")],
        ),
        snapshot(
            &Unit::new("billing", "host-1"),
            vec![
                measurement("mem.used", Severity::Error, "97%"),
                measurement("load.avg", Severity::Info, "0.5"),
            ],
        ),
    ]);

    let lines = alerter.handle_combined_alerting(&statuses).await;
    let headers: Vec<_> = lines.iter().map(|line| line.header.as_str()).collect();
    assert_eq!(
        headers,
        vec![
            "mem.used @ api: 0 x error, 1 x warn, 0 x ok",
            "mem.used @ billing: 1 x error, 0 x warn, 0 x ok",
        ]
    );
    assert_eq!(lines[1].component.as_deref(), Some("billing"));
    assert_eq!(lines[1].measurement_key.as_deref(), Some("mem.used"));
}

#[tokio::test]
async fn test_reporter_alerts_on_failure_rate() {
    let notifier = Arc::new(RecordingNotifier::default());
    let alerter = Arc::new(StatusAlerter::new(vec![notifier.clone()]));
    let board = Arc::new(StatusBoard::new());
    let unit = Unit::new("payments", "pay-1");

    let rate_sensor = Arc::new(RateSensor::new(4, Some(0.25), Some(0.5)).unwrap());
    let key = SensorKey::with_description("payments.rest.calls", "Check the card processor");

    let sensors: Vec<Arc<dyn Sensor>> = vec![rate_sensor.clone()];
    let reporter = ReporterHandle::spawn(
        unit.clone(),
        Duration::from_secs(3600),
        sensors,
        board.clone(),
        alerter,
    );

    rate_sensor.record_success(&key);
    rate_sensor.record_failure(&key);
    rate_sensor.record_failure(&key);

    // Window not full yet
    let snapshot = reporter.report_now().await.unwrap();
    assert_eq!(snapshot.measurements[0].status, Severity::Info);
    assert!(notifier.statuses().is_empty());

    rate_sensor.record_success(&key);

    let snapshot = reporter.report_now().await.unwrap();
    assert_eq!(snapshot.measurements[0].status, Severity::Error);
    assert_eq!(
        snapshot.measurements[0].description.as_deref(),
        Some("Check the card processor")
    );

    let sent = notifier.statuses();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.key, "payments.rest.calls");

    let batch = notifier.batches().pop().unwrap();
    assert_eq!(batch.len(), 1);
    assert!(batch[0].body.starts_with("Check the card processor\n"));

    assert_eq!(board.len(), 1);
    reporter.shutdown().await.unwrap();
}
