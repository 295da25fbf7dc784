use std::collections::BTreeMap;

/// One declared port on a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    /// Port name, may be empty.
    pub name: String,
    /// Service-facing port.
    pub port: u16,
    /// Backing-pod port. `None` when the source event carried zero,
    /// i.e. the target port is unspecified and defaults to `port`.
    pub target_port: Option<u16>,
}

/// A live service record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Service namespace.
    pub namespace: String,
    /// Service name.
    pub name: String,
    /// Resource version.
    pub resource_version: String,
    /// Cluster (virtual) IP.
    pub cluster_ip: String,
    /// Pod-selecting label requirements.
    pub selector: BTreeMap<String, String>,
    /// Declared ports, in source order.
    pub ports: Vec<ServicePort>,
}

impl Service {
    /// The `kubernetes` service in `default`, whose cluster IP is the
    /// cluster API's address — looked up once at startup.
    #[must_use]
    pub fn is_cluster_api_service(&self) -> bool {
        self.name == "kubernetes" && self.namespace == "default"
    }

    /// Find the declared port whose `port` field equals `port`.
    #[must_use]
    pub fn port_by_number(&self, port: u16) -> Option<&ServicePort> {
        self.ports.iter().find(|p| p.port == port)
    }
}
