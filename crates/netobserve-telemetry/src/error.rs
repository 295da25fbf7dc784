//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur setting up the metrics listener.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `VIZ_METRICS_PORT` was not set.
    #[error("{0} is not set")]
    MissingPort(&'static str),

    /// `VIZ_METRICS_PORT` did not parse as a `u16`.
    #[error("invalid metrics port: {0}")]
    InvalidPort(String),

    /// The Prometheus exporter failed to bind its HTTP listener.
    #[error("failed to install metrics recorder: {0}")]
    RecorderInstall(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
