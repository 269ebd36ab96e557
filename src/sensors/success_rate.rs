//! RateSensor - classifies success/failure ticks over a sliding window
//!
//! Every [`SensorKey`] owns a ring buffer of at most `number_to_keep` ticks.
//! The oldest tick is evicted when a new one arrives on a full buffer.
//!
//! ## Classification
//!
//! ```text
//! window not full yet            → INFO (not enough calls)
//! every tick older than an hour  → INFO (outdated)
//! failure ratio >= error_limit   → ERROR
//! failure ratio >= warn_limit    → WARN
//! otherwise                      → INFO
//! ```
//!
//! Recording and measuring share one lock per sensor. This serializes all
//! keys of a sensor and trades throughput under heavy tick volume for a
//! simple, tear-free `measure()`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{trace, warn};

use crate::{Error, Measurement, MetricValue, Result, Severity, StandardUnit};

use super::{Clock, Sensor, SensorKey, SystemClock};

/// Ticks at least this old count as outdated
const STALE_AFTER_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub outcome: Outcome,
    pub at: DateTime<Utc>,
}

pub struct RateSensor {
    number_to_keep: usize,

    /// Failure ratio (0.0 - 1.0) at which the key turns WARN
    warn_limit: Option<f64>,

    /// Failure ratio (0.0 - 1.0) at which the key turns ERROR
    error_limit: Option<f64>,

    windows: Mutex<BTreeMap<SensorKey, VecDeque<Tick>>>,

    clock: Arc<dyn Clock>,
}

impl RateSensor {
    pub fn new(number_to_keep: usize, warn_limit: Option<f64>, error_limit: Option<f64>) -> Result<Self> {
        Self::with_clock(number_to_keep, warn_limit, error_limit, Arc::new(SystemClock))
    }

    pub fn with_clock(
        number_to_keep: usize,
        warn_limit: Option<f64>,
        error_limit: Option<f64>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if number_to_keep == 0 {
            return Err(Error::InvalidConfig(
                "rate sensor must keep at least one tick".to_string(),
            ));
        }

        for limit in [warn_limit, error_limit].into_iter().flatten() {
            if !(0.0..=1.0).contains(&limit) {
                return Err(Error::InvalidConfig(format!(
                    "rate sensor limit {limit} is not a ratio between 0.0 and 1.0"
                )));
            }
        }

        Ok(Self {
            number_to_keep,
            warn_limit,
            error_limit,
            windows: Mutex::new(BTreeMap::new()),
            clock,
        })
    }

    pub fn number_to_keep(&self) -> usize {
        self.number_to_keep
    }

    pub fn record_success(&self, key: &SensorKey) {
        self.record(key, Outcome::Success);
    }

    pub fn record_failure(&self, key: &SensorKey) {
        self.record(key, Outcome::Failure);
    }

    /// Number of ticks currently retained for `key`
    pub fn retained(&self, key: &SensorKey) -> usize {
        self.windows
            .lock()
            .map(|windows| windows.get(key).map_or(0, VecDeque::len))
            .unwrap_or_default()
    }

    fn record(&self, key: &SensorKey, outcome: Outcome) {
        if let Err(e) = self.try_record(key, outcome) {
            warn!("failed to record {outcome:?} for {}: {e}", key.key);
        }
    }

    fn try_record(&self, key: &SensorKey, outcome: Outcome) -> Result<()> {
        let at = self.clock.now();
        let mut windows = self
            .windows
            .lock()
            .map_err(|e| Error::Poisoned(e.to_string()))?;

        let window = windows
            .entry(key.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.number_to_keep));

        while window.len() >= self.number_to_keep {
            window.pop_front();
        }
        window.push_back(Tick { outcome, at });

        trace!("{}: recorded {outcome:?} ({}/{})", key.key, window.len(), self.number_to_keep);
        Ok(())
    }
}

impl Sensor for RateSensor {
    fn name(&self) -> &str {
        "success-rate"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        let now = self.clock.now();
        let windows = self
            .windows
            .lock()
            .map_err(|e| Error::Poisoned(e.to_string()))?;

        let measurements = windows
            .iter()
            .map(|(key, ticks)| {
                let summary = WindowSummary::of(ticks.iter(), self.number_to_keep, now);
                let status = summary.status(self.warn_limit, self.error_limit);

                Measurement::new(key.key.clone(), status, summary.display(self.number_to_keep))
                    .with_description(key.description.clone())
                    .with_metric(MetricValue::new(
                        summary.failure_ratio * 100.0,
                        StandardUnit::Percent,
                    ))
            })
            .collect();

        Ok(measurements)
    }
}

/// Aggregate view of one tick window at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    pub all: usize,
    pub failures: usize,
    pub failure_ratio: f64,
    pub enough_data: bool,
    pub all_stale: bool,
}

impl WindowSummary {
    pub fn of<'a>(
        ticks: impl Iterator<Item = &'a Tick> + Clone,
        number_to_keep: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let all = ticks.clone().count();
        let failures = ticks
            .clone()
            .filter(|tick| tick.outcome == Outcome::Failure)
            .count();

        let failure_ratio = if all > 0 {
            failures as f64 / all as f64
        } else {
            0.0
        };

        // an empty window is never outdated
        let stale_after = Duration::seconds(STALE_AFTER_SECS);
        let all_stale = all > 0 && ticks.clone().all(|tick| now - tick.at >= stale_after);

        Self {
            all,
            failures,
            failure_ratio,
            enough_data: all == number_to_keep,
            all_stale,
        }
    }

    pub fn status(&self, warn_limit: Option<f64>, error_limit: Option<f64>) -> Severity {
        if !self.enough_data || self.all_stale {
            return Severity::Info;
        }

        if error_limit.is_some_and(|limit| self.failure_ratio >= limit) {
            return Severity::Error;
        }

        if warn_limit.is_some_and(|limit| self.failure_ratio >= limit) {
            return Severity::Warn;
        }

        Severity::Info
    }

    pub fn display(&self, number_to_keep: usize) -> String {
        format!(
            "Last {} calls: {} success, {} failure ({:.2}% failure){}{}",
            self.all.min(number_to_keep),
            self.all - self.failures,
            self.failures,
            self.failure_ratio * 100.0,
            if self.enough_data {
                ""
            } else {
                " - not enough calls to report status yet"
            },
            if self.all_stale {
                " - all ticks are outdated"
            } else {
                ""
            },
        )
    }
}
