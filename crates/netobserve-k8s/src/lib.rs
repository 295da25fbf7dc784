//! Cluster API watch client adapter: five watchers (pods, services,
//! deployments, stateful sets, daemon sets) feeding [`ResourceIndex`], plus
//! the startup cluster-API-service-IP lookup.

mod client;
mod controllers;
mod error;
mod pods;
mod services;

pub use client::{cluster_api_service_ip, connect};
pub use controllers::{watch_daemon_sets, watch_deployments, watch_stateful_sets};
pub use error::K8sError;
pub use pods::watch_pods;
pub use services::watch_services;

use std::sync::Arc;

use kube::Client;
use netobserve_core::ResourceIndex;
use tokio::task::JoinHandle;

/// Starts all five watchers against `client`, feeding `index`. Mirrors
/// `main()` spawning `WatchPods`/`WatchDeployments`/`WatchServices`/
/// `WatchStatefulSets`/`WatchDaemonSets` as five goroutines.
pub fn watch_all(client: Client, index: Arc<ResourceIndex>) -> Vec<JoinHandle<()>> {
    vec![
        watch_pods(client.clone(), index.clone()),
        watch_services(client.clone(), index.clone()),
        watch_deployments(client.clone(), index.clone()),
        watch_stateful_sets(client.clone(), index.clone()),
        watch_daemon_sets(client, index),
    ]
}
