pub mod actors;
pub mod alerting;
pub mod board;
pub mod config;
pub mod error;
pub mod notify;
pub mod sensors;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Identity of a monitored process or instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit {
    pub component: String,
    pub server: String,
}

impl Unit {
    pub fn new(component: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            server: server.into(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.component, self.server)
    }
}

/// Health level of a measurement, ordered `Info < Warn < Error`.
///
/// On the wire a severity is one of the tokens `INFO`, `WARN` or `ERROR`,
/// matched case-insensitively. Any other token is rejected when parsing, so
/// the rest of the crate only ever sees the canonical three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Error => "🟥",
            Severity::Warn => "🟨",
            Severity::Info => "🟩",
        }
    }

    pub fn is_info(&self) -> bool {
        matches!(self, Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("INFO") {
            Ok(Severity::Info)
        } else if token.eq_ignore_ascii_case("WARN") {
            Ok(Severity::Warn)
        } else if token.eq_ignore_ascii_case("ERROR") {
            Ok(Severity::Error)
        } else {
            Err(Error::UnknownSeverity(s.to_string()))
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.label().to_string()
    }
}

/// Unit of measure attached to an exported metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardUnit {
    Percent,
    Count,
    Milliseconds,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDimension {
    pub name: String,
    pub value: String,
}

impl MetricDimension {
    pub fn instance(host: impl Into<String>) -> Self {
        Self {
            name: "InstanceId".to_string(),
            value: host.into(),
        }
    }
}

/// Numeric payload of a measurement, meant for a metrics backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: f64,
    pub unit: StandardUnit,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<MetricDimension>,
}

impl MetricValue {
    pub fn new(value: f64, unit: StandardUnit) -> Self {
        Self {
            value,
            unit,
            dimensions: Vec::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<MetricDimension>) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub key: String,
    pub status: Severity,
    pub display_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricValue>,
}

impl Measurement {
    pub fn new(key: impl Into<String>, status: Severity, display_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status,
            display_value: display_value.into(),
            description: None,
            metric: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_metric(mut self, metric: MetricValue) -> Self {
        self.metric = Some(metric);
        self
    }
}

/// Every measurement of one unit at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub unit: Unit,
    pub measurements: Vec<Measurement>,
    pub created_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(unit: Unit, measurements: Vec<Measurement>, created_at: DateTime<Utc>) -> Self {
        Self {
            unit,
            measurements,
            created_at,
        }
    }

    /// A snapshot whose age has reached `max_age` counts as older.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= max_age
    }
}
