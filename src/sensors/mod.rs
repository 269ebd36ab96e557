//! Sensors turn raw observations into [`Measurement`]s
//!
//! A reporting driver folds the output of every sensor of a unit into one
//! [`StatusSnapshot`](crate::StatusSnapshot) per cycle.
//!
//! ## Sensors
//!
//! - **RateSensor**: sliding window of success/failure ticks per key
//! - **MemorySensor**: system memory usage
//! - **LoadSensor**: one-minute load average
//! - **FileHandleSensor**: open file handles of this process
//! - **EventCounter**: audit events since the last report
//! - **VersionSensor**: the version this unit runs

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::{Measurement, Result};

pub mod events;
pub mod success_rate;
pub mod system;
pub mod version;

pub use events::{AuditEvent, EventCounter};
pub use success_rate::RateSensor;
pub use system::{FileHandleSensor, LoadSensor, MemorySensor};
pub use version::VersionSensor;

pub trait Sensor: Send + Sync {
    /// Name used in logs when the sensor fails
    fn name(&self) -> &str;

    fn measure(&self) -> Result<Vec<Measurement>>;
}

/// Identifies one tick window of a [`RateSensor`].
///
/// Two keys with the same `key` but different descriptions are separate
/// windows, so callers should use one description per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorKey {
    /// Key separating alerts from each other, e.g. `"payments.rest.calls"`
    pub key: String,

    /// What is happening when this alert fires and what to do about it
    pub description: Option<String>,
}

impl SensorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: None,
        }
    }

    pub fn with_description(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: Some(description.into()),
        }
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
