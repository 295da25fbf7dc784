use std::collections::BTreeMap;

use crate::CoreError;

/// A live pod record.
///
/// Invariant: `pod_ip` is non-empty — [`Pod::new`] rejects records lacking
/// one, matching the "records lacking an IP are rejected at ingestion" rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Resource version, used to suppress cosmetic update events.
    pub resource_version: String,
    /// Pod IP address.
    pub pod_ip: String,
    /// IP of the node hosting this pod.
    pub host_ip: String,
    /// Whether the pod uses the host's network namespace.
    pub host_network: bool,
    /// Pod labels.
    pub labels: BTreeMap<String, String>,
}

impl Pod {
    /// Construct a pod record, rejecting ones with no pod IP.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
        pod_ip: impl Into<String>,
        host_ip: impl Into<String>,
        host_network: bool,
        labels: BTreeMap<String, String>,
    ) -> Result<Self, CoreError> {
        let namespace = namespace.into();
        let name = name.into();
        let pod_ip = pod_ip.into();
        if pod_ip.is_empty() {
            return Err(CoreError::MissingPodIp { namespace, name });
        }
        Ok(Self {
            namespace,
            name,
            resource_version: resource_version.into(),
            pod_ip,
            host_ip: host_ip.into(),
            host_network,
            labels,
        })
    }

    /// Pods in `kube-system` are discarded by every consumer (§4.5 step 1).
    #[must_use]
    pub fn is_system_namespace(&self) -> bool {
        self.namespace == "kube-system"
    }

    /// Whether this record differs from `other` in anything but
    /// `resource_version` — used to suppress cosmetic update events.
    #[must_use]
    pub fn differs_ignoring_resource_version(&self, other: &Pod) -> bool {
        self.namespace != other.namespace
            || self.name != other.name
            || self.pod_ip != other.pod_ip
            || self.host_ip != other.host_ip
            || self.host_network != other.host_network
            || self.labels != other.labels
    }
}
