use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Controller, Pod, ResourceKind, Service};

/// Common capability set shared by pods, services, and controllers: a
/// namespace-scoped identity plus a selector/label set (§9 "Polymorphism
/// over resource kinds").
pub trait Resource {
    /// Resource namespace.
    fn namespace(&self) -> &str;
    /// Resource name.
    fn name(&self) -> &str;
    /// Which [`ResourceKind`] this resource is.
    fn kind(&self) -> ResourceKind;
    /// For pods, their labels; for services and controllers, their selector.
    fn selector(&self) -> &BTreeMap<String, String>;
}

impl Resource for Pod {
    fn namespace(&self) -> &str {
        &self.namespace
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pod
    }
    fn selector(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}

impl Resource for Service {
    fn namespace(&self) -> &str {
        &self.namespace
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }
    fn selector(&self) -> &BTreeMap<String, String> {
        &self.selector
    }
}

impl Resource for Controller {
    fn namespace(&self) -> &str {
        &self.namespace
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Controller
    }
    fn selector(&self) -> &BTreeMap<String, String> {
        &self.selector
    }
}

/// A type-erased reference to one resource, the unit the [`crate::SelectorIndex`]
/// stores and returns. Cheap to clone — each variant wraps an `Arc`.
#[derive(Debug, Clone)]
pub enum ResourceHandle {
    /// A pod.
    Pod(Arc<Pod>),
    /// A service.
    Service(Arc<Service>),
    /// A controller.
    Controller(Arc<Controller>),
}

impl ResourceHandle {
    /// Borrow the pod, if this handle holds one.
    #[must_use]
    pub fn as_pod(&self) -> Option<&Arc<Pod>> {
        match self {
            Self::Pod(pod) => Some(pod),
            _ => None,
        }
    }

    /// Borrow the service, if this handle holds one.
    #[must_use]
    pub fn as_service(&self) -> Option<&Arc<Service>> {
        match self {
            Self::Service(service) => Some(service),
            _ => None,
        }
    }

    /// Borrow the controller, if this handle holds one.
    #[must_use]
    pub fn as_controller(&self) -> Option<&Arc<Controller>> {
        match self {
            Self::Controller(controller) => Some(controller),
            _ => None,
        }
    }
}

impl Resource for ResourceHandle {
    fn namespace(&self) -> &str {
        match self {
            Self::Pod(r) => r.namespace(),
            Self::Service(r) => r.namespace(),
            Self::Controller(r) => r.namespace(),
        }
    }
    fn name(&self) -> &str {
        match self {
            Self::Pod(r) => r.name(),
            Self::Service(r) => r.name(),
            Self::Controller(r) => r.name(),
        }
    }
    fn kind(&self) -> ResourceKind {
        match self {
            Self::Pod(r) => r.kind(),
            Self::Service(r) => r.kind(),
            Self::Controller(r) => r.kind(),
        }
    }
    fn selector(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Pod(r) => r.selector(),
            Self::Service(r) => r.selector(),
            Self::Controller(r) => r.selector(),
        }
    }
}
