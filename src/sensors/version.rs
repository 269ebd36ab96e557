use crate::{Measurement, Result, Severity};

use super::Sensor;

/// Always-INFO measurement carrying the version this unit runs.
#[derive(Debug, Clone)]
pub struct VersionSensor {
    key: String,
    version: String,
}

impl VersionSensor {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
        }
    }
}

impl Default for VersionSensor {
    fn default() -> Self {
        Self::new("watchpost.version", env!("CARGO_PKG_VERSION"))
    }
}

impl Sensor for VersionSensor {
    fn name(&self) -> &str {
        "version"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        Ok(vec![Measurement::new(
            self.key.clone(),
            Severity::Info,
            self.version.clone(),
        )])
    }
}
