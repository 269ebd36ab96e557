//! SeverityAggregator - cross-unit rollup of the latest snapshots
//!
//! Measurements of all fresh snapshots are grouped by
//! `"<measurement key> @ <component>"`, so servers of one component share a
//! group while components stay apart. Only groups whose highest severity is
//! WARN or ERROR are rendered. Every cycle renders the complete picture; there
//! is no diffing against the previous cycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::trace;

use crate::sensors::{Clock, SystemClock};
use crate::{Measurement, Severity, StatusSnapshot, Unit};

/// Snapshots at least this old are left out of the rollup
pub const SNAPSHOT_MAX_AGE_SECS: i64 = 5 * 60;

/// Width of the server column in rendered lines
const SERVER_WIDTH: usize = 13;

const ELLIPSIS: &str = "...";

/// One rendered group, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedLine {
    pub severity: Severity,
    pub header: String,
    pub body: String,
    pub component: Option<String>,
    pub measurement_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Contribution<'a> {
    unit: &'a Unit,
    measurement: &'a Measurement,
}

pub struct SeverityAggregator {
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl SeverityAggregator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_age: Duration::seconds(SNAPSHOT_MAX_AGE_SECS),
        }
    }

    /// Group and render the current snapshots of all units.
    ///
    /// Groups come out ordered by group key.
    pub fn aggregate(&self, statuses: &HashMap<Unit, StatusSnapshot>) -> Vec<CombinedLine> {
        let now = self.clock.now();

        let mut fresh: Vec<_> = statuses
            .iter()
            .filter(|(_, snapshot)| !snapshot.is_older_than(self.max_age, now))
            .collect();
        fresh.sort_by(|(a, _), (b, _)| a.cmp(b));

        trace!("aggregating {} of {} snapshots", fresh.len(), statuses.len());

        let mut groups: BTreeMap<String, Vec<Contribution>> = BTreeMap::new();
        for (unit, snapshot) in fresh {
            for measurement in &snapshot.measurements {
                groups
                    .entry(group_key(&measurement.key, &unit.component))
                    .or_default()
                    .push(Contribution { unit, measurement });
            }
        }

        groups
            .into_iter()
            .filter_map(|(key, contributions)| {
                let severity = highest_severity(&contributions);
                (!severity.is_info()).then(|| render(&key, severity, &contributions))
            })
            .collect()
    }
}

impl Default for SeverityAggregator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

pub fn group_key(measurement_key: &str, component: &str) -> String {
    format!("{measurement_key} @ {component}")
}

/// An empty group counts as INFO.
fn highest_severity(contributions: &[Contribution]) -> Severity {
    contributions
        .iter()
        .map(|c| c.measurement.status)
        .max()
        .unwrap_or(Severity::Info)
}

fn render(key: &str, severity: Severity, contributions: &[Contribution]) -> CombinedLine {
    let first = contributions.first();

    CombinedLine {
        severity,
        header: header(key, contributions),
        body: format!("{}{}", description(first), details(contributions)),
        component: first.map(|c| c.unit.component.clone()),
        measurement_key: first.map(|c| c.measurement.key.clone()),
    }
}

fn header(key: &str, contributions: &[Contribution]) -> String {
    let count = |severity: Severity| {
        contributions
            .iter()
            .filter(|c| c.measurement.status == severity)
            .count()
    };

    format!(
        "{key}: {} x error, {} x warn, {} x ok",
        count(Severity::Error),
        count(Severity::Warn),
        count(Severity::Info)
    )
}

fn description(first: Option<&Contribution>) -> String {
    first
        .and_then(|c| c.measurement.description.as_deref())
        .filter(|description| !description.is_empty())
        .map(|description| format!("{description}\n"))
        .unwrap_or_default()
}

/// One line per contribution, ordered by severity label.
fn details(contributions: &[Contribution]) -> String {
    let mut sorted = contributions.to_vec();
    sorted.sort_by_key(|c| c.measurement.status.label());

    sorted
        .iter()
        .map(|c| {
            format!(
                "{} `{}` _{}_",
                c.measurement.status.emoji(),
                server_column(&c.unit.server),
                c.measurement.display_value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Abbreviates with an ellipsis past the column width, then pads to it.
pub fn server_column(server: &str) -> String {
    let abbreviated = if server.chars().count() > SERVER_WIDTH {
        let head: String = server
            .chars()
            .take(SERVER_WIDTH - ELLIPSIS.len())
            .collect();
        format!("{head}{ELLIPSIS}")
    } else {
        server.to_string()
    };

    format!("{abbreviated:<width$}", width = SERVER_WIDTH)
}
