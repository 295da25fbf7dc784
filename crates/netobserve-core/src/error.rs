//! Errors raised constructing data-model records.

use thiserror::Error;

/// Errors raised while constructing or validating a resource record.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A pod event carried no pod IP. Such records are rejected at
    /// ingestion rather than indexed.
    #[error("pod {namespace}/{name} has no pod IP, rejected at ingestion")]
    MissingPodIp {
        /// Pod namespace.
        namespace: String,
        /// Pod name.
        name: String,
    },
}
