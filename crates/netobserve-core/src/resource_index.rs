use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Controller, Pod, Resource, ResourceHandle, ResourceKind, SelectorIndex, Service};

/// One pod add/update/delete event, as delivered by the cluster API watch
/// client.
#[derive(Debug, Clone)]
pub enum PodEvent {
    /// Pod added.
    Added(Pod),
    /// Pod modified; carries both the old and new record so resource-version
    /// suppression and host-network-transition handling can compare them.
    Modified { old: Pod, new: Pod },
    /// Pod deleted.
    Deleted(Pod),
}

#[derive(Default)]
struct Inner {
    pod_by_ip: HashMap<String, Arc<Pod>>,
    service_by_cluster_ip: HashMap<String, Arc<Service>>,
    selector_index: SelectorIndex,
    local_pod_ip: Option<String>,
    cluster_api_service_ip: Option<String>,
    node_ips: Vec<String>,
}

/// Holds the three authoritative tables — pod-IP→pod, service-cluster-IP→
/// service, and the selector index — behind a single lock (§4.2, §5).
///
/// All operations, including queries, take the writer lock: the source
/// always acquires its single mutex exclusively, never distinguishing reads
/// from writes, and the Selector Index must only ever be reached while that
/// lock is held. Routing every method through one `RwLock::write` makes that
/// structurally true instead of runtime-asserted.
pub struct ResourceIndex {
    inner: RwLock<Inner>,
}

impl ResourceIndex {
    /// Create an empty index. `node_ips` are this process's local IPv4
    /// interface addresses, used for local-pod-IP discovery.
    #[must_use]
    pub fn new(node_ips: Vec<String>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                node_ips,
                ..Default::default()
            }),
        }
    }

    /// Look up the pod currently indexed at `ip`.
    #[must_use]
    pub fn pod_by_ip(&self, ip: &str) -> Option<Arc<Pod>> {
        self.inner.write().pod_by_ip.get(ip).cloned()
    }

    /// Look up the service currently indexed at cluster IP `ip`.
    #[must_use]
    pub fn service_by_cluster_ip(&self, ip: &str) -> Option<Arc<Service>> {
        self.inner.write().service_by_cluster_ip.get(ip).cloned()
    }

    /// The IP of a pod observed on this node, once latched.
    #[must_use]
    pub fn local_pod_ip(&self) -> Option<String> {
        self.inner.write().local_pod_ip.clone()
    }

    /// The cluster API service's cluster IP, once recorded by the caller via
    /// [`Self::set_cluster_api_service_ip`].
    #[must_use]
    pub fn cluster_api_service_ip(&self) -> Option<String> {
        self.inner.write().cluster_api_service_ip.clone()
    }

    /// Record the cluster API's cluster IP, looked up once at startup.
    pub fn set_cluster_api_service_ip(&self, ip: String) {
        self.inner.write().cluster_api_service_ip = Some(ip);
    }

    /// Pods backing `service`, via `match(service, pod)`.
    #[must_use]
    pub fn pods_for_service(&self, service: &Arc<Service>) -> Vec<Arc<Pod>> {
        let query = ResourceHandle::Service(service.clone());
        let guard = self.inner.write();
        guard
            .selector_index
            .match_resources(&query, ResourceKind::Pod)
            .into_iter()
            .filter_map(|handle| match handle {
                ResourceHandle::Pod(pod) => Some(pod),
                _ => None,
            })
            .collect()
    }

    /// The controller owning `pod`, via `match(pod, controller)`, breaking
    /// ties toward the controller with the greatest selector cardinality
    /// (ties further broken by leaving the first-seen candidate in place).
    #[must_use]
    pub fn controller_for_pod(&self, pod: &Arc<Pod>) -> Option<Arc<Controller>> {
        let query = ResourceHandle::Pod(pod.clone());
        let guard = self.inner.write();
        guard
            .selector_index
            .match_resources(&query, ResourceKind::Controller)
            .into_iter()
            .filter_map(|handle| match handle {
                ResourceHandle::Controller(controller) => Some(controller),
                _ => None,
            })
            .fold(None, |best: Option<Arc<Controller>>, candidate| {
                match &best {
                    Some(current) if current.selector.len() >= candidate.selector.len() => best,
                    _ => Some(candidate),
                }
            })
    }

    /// Apply one pod event, handling host-network filtering and
    /// resource-version-only-diff suppression (§4.2).
    pub fn handle_pod_event(&self, event: PodEvent) {
        match event {
            PodEvent::Added(pod) => {
                if !pod.host_network {
                    self.pod_added(pod);
                }
            }
            PodEvent::Deleted(pod) => {
                if !pod.host_network {
                    self.pod_deleted(&pod);
                }
            }
            PodEvent::Modified { old, new } => {
                let old_valid = !old.host_network;
                let new_valid = !new.host_network;
                if !old_valid && new_valid {
                    self.pod_added(new);
                } else if old_valid && !new_valid {
                    self.pod_deleted(&old);
                } else if old_valid && new_valid {
                    if old.differs_ignoring_resource_version(&new) {
                        self.pod_deleted(&old);
                        self.pod_added(new);
                    }
                    // else: resource-version-only update, suppressed.
                }
                // else: both invalid (host-network), never indexed, no-op.
            }
        }
    }

    fn pod_added(&self, pod: Pod) {
        let pod = Arc::new(pod);
        let mut guard = self.inner.write();
        if guard.local_pod_ip.is_none()
            && guard.node_ips.iter().any(|ip| ip == &pod.host_ip)
        {
            guard.local_pod_ip = Some(pod.pod_ip.clone());
        }
        guard.selector_index.add(&ResourceHandle::Pod(pod.clone()));
        guard.pod_by_ip.insert(pod.pod_ip.clone(), pod);
    }

    fn pod_deleted(&self, pod: &Pod) {
        let mut guard = self.inner.write();
        let handle = ResourceHandle::Pod(Arc::new(pod.clone()));
        guard.selector_index.remove(&handle);
        let still_current = guard
            .pod_by_ip
            .get(&pod.pod_ip)
            .is_some_and(|current| current.name == pod.name && current.namespace == pod.namespace);
        if still_current {
            guard.pod_by_ip.remove(&pod.pod_ip);
        }
    }

    /// Add a service. Update is delete-of-old followed by add-of-new,
    /// performed by the caller via [`Self::service_deleted`] then this.
    pub fn service_added(&self, service: Service) {
        let service = Arc::new(service);
        let mut guard = self.inner.write();
        guard
            .selector_index
            .add(&ResourceHandle::Service(service.clone()));
        guard
            .service_by_cluster_ip
            .insert(service.cluster_ip.clone(), service);
    }

    /// Remove a service.
    pub fn service_deleted(&self, service: &Service) {
        let mut guard = self.inner.write();
        let handle = ResourceHandle::Service(Arc::new(service.clone()));
        guard.selector_index.remove(&handle);
        let still_current = guard
            .service_by_cluster_ip
            .get(&service.cluster_ip)
            .is_some_and(|current| {
                current.name == service.name && current.namespace == service.namespace
            });
        if still_current {
            guard.service_by_cluster_ip.remove(&service.cluster_ip);
        }
    }

    /// Add a controller (deployment, stateful set, or daemon set).
    pub fn controller_added(&self, controller: Controller) {
        let mut guard = self.inner.write();
        guard
            .selector_index
            .add(&ResourceHandle::Controller(Arc::new(controller)));
    }

    /// Remove a controller.
    pub fn controller_deleted(&self, controller: &Controller) {
        let mut guard = self.inner.write();
        let handle = ResourceHandle::Controller(Arc::new(controller.clone()));
        guard.selector_index.remove(&handle);
    }
}
