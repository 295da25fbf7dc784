use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::runtime::watcher;
use kube::{Api, Client};
use netobserve_core::{Controller, ControllerKind, ResourceIndex};
use tokio::task::JoinHandle;
use tracing::warn;

fn container_ports_of(containers: &[Container]) -> Vec<u16> {
    containers
        .iter()
        .flat_map(|container| container.ports.iter().flatten())
        .filter_map(|port| u16::try_from(port.container_port).ok())
        .collect()
}

fn build_controller(
    meta: &ObjectMeta,
    selector: &LabelSelector,
    containers: &[Container],
    kind: ControllerKind,
) -> Controller {
    Controller {
        namespace: meta.namespace.clone().unwrap_or_default(),
        name: meta.name.clone().unwrap_or_default(),
        kind,
        selector: selector.match_labels.clone().unwrap_or_default(),
        container_ports: container_ports_of(containers),
    }
}

fn from_deployment(deployment: &Deployment) -> Option<Controller> {
    let spec = deployment.spec.as_ref()?;
    let pod_spec = spec.template.spec.as_ref()?;
    Some(build_controller(
        &deployment.metadata,
        &spec.selector,
        &pod_spec.containers,
        ControllerKind::Deployment,
    ))
}

fn from_stateful_set(stateful_set: &StatefulSet) -> Option<Controller> {
    let spec = stateful_set.spec.as_ref()?;
    let pod_spec = spec.template.spec.as_ref()?;
    Some(build_controller(
        &stateful_set.metadata,
        &spec.selector,
        &pod_spec.containers,
        ControllerKind::StatefulSet,
    ))
}

fn from_daemon_set(daemon_set: &DaemonSet) -> Option<Controller> {
    let spec = daemon_set.spec.as_ref()?;
    let pod_spec = spec.template.spec.as_ref()?;
    Some(build_controller(
        &daemon_set.metadata,
        &spec.selector,
        &pod_spec.containers,
        ControllerKind::DaemonSet,
    ))
}

/// Shared watch loop body for the three controller kinds: same
/// add/update/delete tracking as [`crate::services::watch_services`], since
/// [`ResourceIndex`] treats controllers identically regardless of kind.
macro_rules! controller_watch_fn {
    ($fn_name:ident, $k8s_type:ty, $convert:ident, $what:literal) => {
        #[doc = concat!("Watches ", $what, "s cluster-wide, feeding add/update/delete into `index`.")]
        pub fn $fn_name(client: Client, index: Arc<ResourceIndex>) -> JoinHandle<()> {
            tokio::spawn(async move {
                let api: Api<$k8s_type> = Api::all(client);
                let stream = watcher(api, watcher::Config::default());
                tokio::pin!(stream);

                let mut seen: HashMap<(String, String), Controller> = HashMap::new();

                while let Some(event) = stream.next().await {
                    match event {
                        Ok(watcher::Event::Apply(raw) | watcher::Event::InitApply(raw)) => {
                            let Some(controller) = $convert(&raw) else {
                                continue;
                            };
                            let key = (controller.namespace.clone(), controller.name.clone());
                            if let Some(old) = seen.insert(key, controller.clone()) {
                                index.controller_deleted(&old);
                            }
                            index.controller_added(controller);
                        }
                        Ok(watcher::Event::Delete(raw)) => {
                            let Some(controller) = $convert(&raw) else {
                                continue;
                            };
                            let key = (controller.namespace.clone(), controller.name.clone());
                            seen.remove(&key);
                            index.controller_deleted(&controller);
                        }
                        Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
                        Err(err) => {
                            warn!(error = %err, kind = $what, "controller watch stream error, kube retries with backoff");
                        }
                    }
                }
            })
        }
    };
}

controller_watch_fn!(watch_deployments, Deployment, from_deployment, "deployment");
controller_watch_fn!(watch_stateful_sets, StatefulSet, from_stateful_set, "stateful set");
controller_watch_fn!(watch_daemon_sets, DaemonSet, from_daemon_set, "daemon set");

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::{ContainerPort, PodSpec, PodTemplateSpec};
    use std::collections::BTreeMap;

    fn deployment_with_container_port(port: i32) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("web".into()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "web".into(),
                            ports: Some(vec![ContainerPort {
                                container_port: port,
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    #[test]
    fn converts_deployment_selector_and_container_ports() {
        let controller = from_deployment(&deployment_with_container_port(8080)).unwrap();
        assert_eq!(controller.kind, ControllerKind::Deployment);
        assert_eq!(controller.selector.get("app").unwrap(), "web");
        assert_eq!(controller.container_ports, vec![8080]);
    }

    #[test]
    fn deployment_with_no_pod_spec_is_skipped() {
        let mut deployment = deployment_with_container_port(8080);
        deployment.spec.as_mut().unwrap().template.spec = None;
        assert!(from_deployment(&deployment).is_none());
    }
}
