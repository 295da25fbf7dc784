#[derive(Debug, thiserror::Error)]
pub enum K8sError {
    #[error("failed to build Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}
