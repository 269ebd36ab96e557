//! Sensors reading the host and this process through `sysinfo`

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::{Error, Measurement, MetricDimension, MetricValue, Result, Severity, StandardUnit};

use super::Sensor;

const BYTES_IN_MB: u64 = 1024 * 1024;

const MEMORY_DESCRIPTION: &str = "When this alarm is triggered, you should check the memory status of the other nodes as well. \
There might be a memory leak somewhere in the application triggering this, so a restart will buy you some time";

/// Reports used system memory in percent of total memory.
#[derive(Debug, Clone)]
pub struct MemorySensor {
    warn_limit: u64,
    error_limit: u64,
    hostname: Option<String>,
}

impl MemorySensor {
    pub fn new(warn_limit: u64, error_limit: u64, hostname: Option<String>) -> Self {
        Self {
            warn_limit,
            error_limit,
            hostname,
        }
    }

    fn measurement(&self, used: u64, total: u64) -> Option<Measurement> {
        if total == 0 {
            return None;
        }

        let percent_used = used * 100 / total;
        let display = format!(
            "{} of {} MB ({percent_used}%)",
            used / BYTES_IN_MB,
            total / BYTES_IN_MB
        );

        let dimensions = self
            .hostname
            .iter()
            .map(|host| MetricDimension::instance(host.clone()))
            .collect();

        Some(
            Measurement::new(
                "mem.used",
                exceeding_status(percent_used as f64, self.warn_limit as f64, self.error_limit as f64),
                display,
            )
            .with_description(Some(MEMORY_DESCRIPTION.to_string()))
            .with_metric(
                MetricValue::new(percent_used as f64, StandardUnit::Percent)
                    .with_dimensions(dimensions),
            ),
        )
    }
}

impl Default for MemorySensor {
    fn default() -> Self {
        Self::new(85, 95, None)
    }
}

impl Sensor for MemorySensor {
    fn name(&self) -> &str {
        "memory"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        let mut sys = System::new();
        sys.refresh_memory();

        Ok(self
            .measurement(sys.used_memory(), sys.total_memory())
            .into_iter()
            .collect())
    }
}

/// Reports the one-minute load average.
#[derive(Debug, Clone)]
pub struct LoadSensor {
    warn_limit: f64,
    error_limit: f64,
}

impl LoadSensor {
    pub fn new(warn_limit: f64, error_limit: f64) -> Self {
        Self {
            warn_limit,
            error_limit,
        }
    }

    fn measurement(&self, load: f64) -> Measurement {
        Measurement::new(
            "load.avg",
            exceeding_status(load, self.warn_limit, self.error_limit),
            format_load(load),
        )
        .with_metric(MetricValue::new(load, StandardUnit::None))
    }
}

impl Default for LoadSensor {
    fn default() -> Self {
        Self::new(5.0, 10.0)
    }
}

impl Sensor for LoadSensor {
    fn name(&self) -> &str {
        "load"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        Ok(vec![self.measurement(System::load_average().one)])
    }
}

/// Reports open file handles of this process against its limit.
///
/// Unlike memory and load, the limits are handle counts and inclusive.
#[derive(Debug, Clone)]
pub struct FileHandleSensor {
    warn_after: u64,
    error_after: u64,
}

impl FileHandleSensor {
    pub fn new(warn_after: u64, error_after: u64) -> Self {
        Self {
            warn_after,
            error_after,
        }
    }

    fn measurement(&self, open: u64, max: u64) -> Measurement {
        let percent = if max > 0 {
            open as f64 / max as f64 * 100.0
        } else {
            0.0
        };

        let status = if open >= self.error_after {
            Severity::Error
        } else if open >= self.warn_after {
            Severity::Warn
        } else {
            Severity::Info
        };

        Measurement::new(
            "filehandles",
            status,
            format!("{open} of {max} filehandles used ({percent:.2}%)"),
        )
        .with_metric(MetricValue::new(percent, StandardUnit::Percent))
    }

    fn unavailable(&self, message: &str) -> Error {
        Error::Sensor {
            sensor: self.name().to_string(),
            message: message.to_string(),
        }
    }
}

impl Sensor for FileHandleSensor {
    fn name(&self) -> &str {
        "filehandles"
    }

    fn measure(&self) -> Result<Vec<Measurement>> {
        let pid = sysinfo::get_current_pid().map_err(|e| self.unavailable(e))?;

        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        let process = sys
            .process(pid)
            .ok_or_else(|| self.unavailable("own process not found"))?;
        let open = process
            .open_files()
            .ok_or_else(|| self.unavailable("open file count unavailable"))?;
        let max = process
            .open_files_limit()
            .ok_or_else(|| self.unavailable("open file limit unavailable"))?;

        Ok(vec![self.measurement(open as u64, max as u64)])
    }
}

/// System limits are exclusive: a value must go above a limit to trip it.
fn exceeding_status(value: f64, warn_limit: f64, error_limit: f64) -> Severity {
    if value > error_limit {
        Severity::Error
    } else if value > warn_limit {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// At most two decimals, without trailing zeros.
fn format_load(load: f64) -> String {
    let formatted = format!("{load:.2}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
