//! Prometheus metrics publisher for netobserve.
//!
//! Exposes the two metrics the correlation engine emits on every completed
//! request/response pairing:
//!
//! - `requests_total` (counter)
//! - `request_duration_seconds` (histogram, fixed buckets)
//!
//! Both are labelled with `source`, `source_ns`, `destination`,
//! `destination_ns`, `method`, `url`.
//!
//! # Example
//!
//! ```rust,no_run
//! use netobserve_telemetry::{MetricsConfig, RequestLabels, record_request, install};
//!
//! let config = MetricsConfig::from_env().expect("VIZ_METRICS_PORT must be set");
//! let _guard = install(config).expect("failed to bind metrics listener");
//!
//! record_request(
//!     &RequestLabels {
//!         source: "web",
//!         source_ns: "default",
//!         destination: "api",
//!         destination_ns: "default",
//!         method: "GET",
//!         url: "/health",
//!     },
//!     0.050,
//! );
//! ```

mod config;
mod error;
mod init;
mod metrics;

pub use config::MetricsConfig;
pub use error::{TelemetryError, TelemetryResult};
pub use init::{MetricsGuard, install};
pub use metrics::{RequestLabels, record_request};
