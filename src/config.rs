use tracing::trace;

use crate::{Error, Result};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// The unit this hub reports as
    pub unit: UnitConfig,

    /// Seconds between two reports
    #[serde(default = "default_interval")]
    pub interval: usize,

    #[serde(default)]
    pub sensors: SensorsConfig,

    /// Window shared by all probes
    #[serde(default)]
    pub success_rate: SuccessRateConfig,

    #[serde(default)]
    pub probes: Vec<ProbeConfig>,

    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UnitConfig {
    pub component: String,

    /// Falls back to `WATCHPOST_SERVER`, then to the host name
    pub server: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SensorsConfig {
    pub memory: Option<MemoryLimits>,
    pub load: Option<LoadLimits>,
    pub file_handles: Option<FileHandleLimits>,

    /// Report the running watchpost version
    #[serde(default)]
    pub version: bool,

    /// Count audit events of the probes
    #[serde(default)]
    pub audit: bool,
}

/// Percent of total memory
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryLimits {
    #[serde(default = "default_memory_warn")]
    pub warn: u64,
    #[serde(default = "default_memory_error")]
    pub error: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoadLimits {
    #[serde(default = "default_load_warn")]
    pub warn: f64,
    #[serde(default = "default_load_error")]
    pub error: f64,
}

/// Open file handle counts, inclusive
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FileHandleLimits {
    pub warn: u64,
    pub error: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SuccessRateConfig {
    #[serde(default = "default_number_to_keep")]
    pub number_to_keep: usize,

    /// Failure ratio (0.0 - 1.0) that triggers a warning
    pub warn_limit: Option<f64>,

    /// Failure ratio (0.0 - 1.0) that triggers an error
    pub error_limit: Option<f64>,
}

impl Default for SuccessRateConfig {
    fn default() -> Self {
        Self {
            number_to_keep: default_number_to_keep(),
            warn_limit: Some(0.2),
            error_limit: Some(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProbeConfig {
    pub name: String,
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default = "default_probe_interval")]
    pub interval: usize,

    /// Request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: usize,

    /// Defaults to any 2xx status
    pub expected_status: Option<Vec<u16>>,

    /// Regex the response body must match
    pub body_pattern: Option<String>,

    /// Shown with alerts about this probe
    pub description: Option<String>,
}

impl ProbeConfig {
    pub fn sensor_key(&self) -> String {
        format!("probe.{}", self.name)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Discord(Discord),
    Webhook(Webhook),
    Log,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,

    /// Mentioned on ERROR notifications
    pub user_id: Option<String>,
}

fn default_interval() -> usize {
    60
}

fn default_probe_interval() -> usize {
    30
}

fn default_probe_timeout() -> usize {
    10
}

fn default_number_to_keep() -> usize {
    10
}

fn default_memory_warn() -> u64 {
    85
}

fn default_memory_error() -> u64 {
    95
}

fn default_load_warn() -> f64 {
    5.0
}

fn default_load_error() -> f64 {
    10.0
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.unit.component.trim().is_empty() {
            return Err(Error::InvalidConfig("unit component must not be empty".into()));
        }

        if self.interval == 0 {
            return Err(Error::InvalidConfig("interval must be at least 1s".into()));
        }

        if let Some(limits) = &self.sensors.file_handles {
            if limits.warn > limits.error {
                return Err(Error::InvalidConfig(
                    "file handle warn limit must not exceed the error limit".into(),
                ));
            }
        }

        let rate = &self.success_rate;
        if rate.number_to_keep == 0 {
            return Err(Error::InvalidConfig("number_to_keep must be at least 1".into()));
        }
        for limit in [rate.warn_limit, rate.error_limit].into_iter().flatten() {
            if !(0.0..=1.0).contains(&limit) {
                return Err(Error::InvalidConfig(format!(
                    "success rate limit {limit} must be between 0.0 and 1.0"
                )));
            }
        }

        for probe in &self.probes {
            if probe.interval == 0 {
                return Err(Error::InvalidConfig(format!(
                    "probe {}: interval must be at least 1s",
                    probe.name
                )));
            }
            if let Some(pattern) = &probe.body_pattern {
                regex::Regex::new(pattern).map_err(|e| {
                    Error::InvalidConfig(format!("probe {}: invalid body pattern: {e}", probe.name))
                })?;
            }
        }

        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
