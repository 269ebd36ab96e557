//! Error types for the crate

use thiserror::Error;

/// Result type alias for watchpost operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A severity token other than INFO, WARN or ERROR
    #[error("unknown severity token: {0:?}")]
    UnknownSeverity(String),

    /// A sensor lock was poisoned by a panicking holder
    #[error("sensor state poisoned: {0}")]
    Poisoned(String),

    /// A sensor could not produce its measurements
    #[error("sensor {sensor} failed: {message}")]
    Sensor { sensor: String, message: String },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An alert target answered with a non-success status
    #[error("delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
