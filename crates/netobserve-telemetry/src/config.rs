//! Metrics listener configuration.

use crate::TelemetryError;

/// Configuration for the Prometheus metrics listener.
///
/// The only knob is the bind port, read from `VIZ_METRICS_PORT` per the
/// external interface contract — there is no other configuration surface.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Port the `/metrics` HTTP listener binds to on `0.0.0.0`.
    pub port: u16,
}

impl MetricsConfig {
    /// Build a config from an explicit port.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Read `VIZ_METRICS_PORT` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::MissingPort`] if the variable is unset and
    /// [`TelemetryError::InvalidPort`] if it isn't a valid `u16`.
    pub fn from_env() -> Result<Self, TelemetryError> {
        let raw = std::env::var("VIZ_METRICS_PORT")
            .map_err(|_| TelemetryError::MissingPort("VIZ_METRICS_PORT"))?;
        let port = raw
            .parse::<u16>()
            .map_err(|_| TelemetryError::InvalidPort(raw))?;
        Ok(Self { port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_carries_port() {
        assert_eq!(MetricsConfig::new(9090).port, 9090);
    }

    #[test]
    fn from_env_rejects_non_numeric_port() {
        // SAFETY: single-threaded test process, no concurrent env readers.
        unsafe {
            std::env::set_var("VIZ_METRICS_PORT", "not-a-port");
        }
        let result = MetricsConfig::from_env();
        unsafe {
            std::env::remove_var("VIZ_METRICS_PORT");
        }
        assert!(matches!(result, Err(TelemetryError::InvalidPort(_))));
    }

    #[test]
    fn from_env_missing_is_an_error() {
        // SAFETY: single-threaded test process, no concurrent env readers.
        unsafe {
            std::env::remove_var("VIZ_METRICS_PORT");
        }
        assert!(matches!(
            MetricsConfig::from_env(),
            Err(TelemetryError::MissingPort(_))
        ));
    }
}
