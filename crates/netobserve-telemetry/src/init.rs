//! Metrics listener lifecycle.

use crate::metrics::{DURATION_BUCKETS, describe_metrics};
use crate::{MetricsConfig, TelemetryError};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tracing::info;

/// Guard owning the installed Prometheus recorder and its HTTP listener.
///
/// Dropping it does not stop the listener — `metrics-exporter-prometheus`
/// hands the HTTP server to its own background task on install. The guard
/// exists so callers have somewhere to hold the handle for the process
/// lifetime, matching how the rest of the workspace threads long-lived
/// resources through `main`.
pub struct MetricsGuard {
    handle: PrometheusHandle,
}

impl std::fmt::Debug for MetricsGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsGuard").finish()
    }
}

impl MetricsGuard {
    /// Render the current registry snapshot in Prometheus exposition format.
    ///
    /// The installed HTTP listener already serves this on `GET /metrics`;
    /// this is exposed for tests and for callers embedding their own router.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the Prometheus recorder and bind its `GET /metrics` HTTP listener.
///
/// # Errors
///
/// Returns [`TelemetryError::RecorderInstall`] if the listener fails to bind
/// (typically because the port is already in use).
pub fn install(config: MetricsConfig) -> Result<MetricsGuard, TelemetryError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("request_duration_seconds".to_string()),
            &DURATION_BUCKETS,
        )
        .map_err(|e| TelemetryError::RecorderInstall(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::RecorderInstall(e.to_string()))?;

    describe_metrics();

    info!(port = config.port, "metrics endpoint listening on /metrics");

    Ok(MetricsGuard { handle })
}
