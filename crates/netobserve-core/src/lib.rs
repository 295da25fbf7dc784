//! Workload-resolution data model.
//!
//! Holds the canonical pod, service, and controller records ingested from
//! the cluster API, and answers the two questions attribution needs: which
//! workload owns a given IP, and which controller owns a given pod.

mod controller;
mod error;
mod kind;
mod pod;
mod resource;
mod resource_index;
mod selector_index;
mod service;

pub use controller::{Controller, ControllerKind};
pub use error::CoreError;
pub use kind::ResourceKind;
pub use pod::Pod;
pub use resource::{Resource, ResourceHandle};
pub use resource_index::{PodEvent, ResourceIndex};
pub use selector_index::SelectorIndex;
pub use service::{Service, ServicePort};
