use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Service as K8sService;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::runtime::watcher;
use kube::{Api, Client};
use netobserve_core::{ResourceIndex, Service, ServicePort};
use tokio::task::JoinHandle;
use tracing::warn;

fn target_port_of(port: &k8s_openapi::api::core::v1::ServicePort) -> Option<u16> {
    match &port.target_port {
        // A target port given as a string names a container port by its
        // declared name rather than a number; the original never resolves
        // that name either (`TargetPort.IntVal` is Go's zero value for a
        // string `IntOrString`), so it falls through to "unspecified, use
        // `port` as-is" the same way here.
        Some(IntOrString::Int(value)) if *value > 0 => u16::try_from(*value).ok(),
        _ => None,
    }
}

fn from_k8s_service(service: &K8sService) -> Option<Service> {
    let meta = &service.metadata;
    let spec = service.spec.as_ref()?;

    let ports = spec
        .ports
        .clone()
        .unwrap_or_default()
        .iter()
        .map(|port| ServicePort {
            name: port.name.clone().unwrap_or_default(),
            port: u16::try_from(port.port).unwrap_or_default(),
            target_port: target_port_of(port),
        })
        .collect();

    Some(Service {
        namespace: meta.namespace.clone().unwrap_or_default(),
        name: meta.name.clone().unwrap_or_default(),
        resource_version: meta.resource_version.clone().unwrap_or_default(),
        cluster_ip: spec.cluster_ip.clone().unwrap_or_default(),
        selector: spec.selector.clone().unwrap_or_default(),
        ports,
    })
}

/// Watches services cluster-wide and feeds add/update/delete into `index`.
/// Update is delete-of-old then add-of-new, as [`ResourceIndex::service_added`]
/// documents its caller must do.
pub fn watch_services(client: Client, index: Arc<ResourceIndex>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api: Api<K8sService> = Api::all(client);
        let stream = watcher(api, watcher::Config::default());
        tokio::pin!(stream);

        let mut seen: HashMap<(String, String), Service> = HashMap::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(watcher::Event::Apply(raw) | watcher::Event::InitApply(raw)) => {
                    let Some(service) = from_k8s_service(&raw) else {
                        continue;
                    };
                    let key = (service.namespace.clone(), service.name.clone());
                    if let Some(old) = seen.insert(key, service.clone()) {
                        index.service_deleted(&old);
                    }
                    index.service_added(service);
                }
                Ok(watcher::Event::Delete(raw)) => {
                    let Some(service) = from_k8s_service(&raw) else {
                        continue;
                    };
                    let key = (service.namespace.clone(), service.name.clone());
                    seen.remove(&key);
                    index.service_deleted(&service);
                }
                Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
                Err(err) => {
                    warn!(error = %err, "service watch stream error, kube retries with backoff");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ServiceSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn k8s_service(target_port: Option<IntOrString>) -> K8sService {
        K8sService {
            metadata: ObjectMeta {
                namespace: Some("default".into()),
                name: Some("web".into()),
                resource_version: Some("7".into()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some("11.0.0.1".into()),
                ports: Some(vec![k8s_openapi::api::core::v1::ServicePort {
                    name: Some("http".into()),
                    port: 80,
                    target_port,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[test]
    fn converts_numeric_target_port() {
        let service = from_k8s_service(&k8s_service(Some(IntOrString::Int(8080)))).unwrap();
        assert_eq!(service.cluster_ip, "11.0.0.1");
        assert_eq!(service.ports[0].target_port, Some(8080));
    }

    #[test]
    fn string_target_port_is_treated_as_unspecified() {
        let service =
            from_k8s_service(&k8s_service(Some(IntOrString::String("http".into())))).unwrap();
        assert_eq!(service.ports[0].target_port, None);
    }

    #[test]
    fn missing_target_port_is_unspecified() {
        let service = from_k8s_service(&k8s_service(None)).unwrap();
        assert_eq!(service.ports[0].target_port, None);
    }
}
