use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::{info, warn};

use crate::error::K8sError;

/// Builds a client the same way the original selected a config: honor
/// `KUBECONFIG` when set, otherwise fall back to in-cluster config.
/// `Client::try_default`'s `Config::infer` already implements exactly that
/// precedence, so no manual env inspection is needed here.
pub async fn connect() -> Result<Client, K8sError> {
    if let Ok(path) = std::env::var("KUBECONFIG") {
        info!(kubeconfig = %path, "connecting with KUBECONFIG");
    } else {
        info!("KUBECONFIG unset, using in-cluster config");
    }
    Ok(Client::try_default().await?)
}

/// Looks up the `kubernetes` service in `default`, returning its cluster IP.
/// Used at startup to seed the BPF filter's "exclude control-plane traffic"
/// clause and attribution's kube-API discard check. Returns `None` rather
/// than erroring when the lookup fails, matching the original's tolerance
/// for running before the API is reachable.
pub async fn cluster_api_service_ip(client: &Client) -> Option<String> {
    let api: Api<Service> = Api::namespaced(client.clone(), "default");
    match api.get("kubernetes").await {
        Ok(service) => service.spec.and_then(|spec| spec.cluster_ip),
        Err(err) => {
            warn!(error = %err, "could not look up the kubernetes service's cluster IP");
            None
        }
    }
}
