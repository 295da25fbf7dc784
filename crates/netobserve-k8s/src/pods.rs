use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod as K8sPod;
use kube::runtime::watcher;
use kube::{Api, Client};
use netobserve_core::{Pod, PodEvent, ResourceIndex};
use tokio::task::JoinHandle;
use tracing::warn;

fn from_k8s_pod(pod: &K8sPod) -> Option<Pod> {
    let meta = &pod.metadata;
    let status = pod.status.as_ref()?;
    let host_network = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.host_network)
        .unwrap_or(false);

    Pod::new(
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
        meta.resource_version.clone().unwrap_or_default(),
        status.pod_ip.clone().unwrap_or_default(),
        status.host_ip.clone().unwrap_or_default(),
        host_network,
        meta.labels.clone().unwrap_or_default(),
    )
    .ok()
}

/// Watches pods cluster-wide and feeds add/modify/delete events into `index`
/// (§4.2, mirroring `WatchPods`/`PodAdded`/`PodUpdated`/`PodDeleted`).
///
/// `kube`'s `watcher` only distinguishes `Apply` (initial sync and updates
/// collapsed together) from `Delete`; the original informer calls
/// `PodAdded` or `PodUpdated` depending on whether it had seen the object
/// before. A local `seen` table reproduces that distinction so
/// [`ResourceIndex::handle_pod_event`] still gets a real `Modified { old,
/// new }` to run its resource-version-suppression and host-network-transition
/// logic against, rather than only ever seeing adds.
pub fn watch_pods(client: Client, index: Arc<ResourceIndex>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api: Api<K8sPod> = Api::all(client);
        let stream = watcher(api, watcher::Config::default());
        tokio::pin!(stream);

        let mut seen: HashMap<(String, String), Pod> = HashMap::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(watcher::Event::Apply(raw) | watcher::Event::InitApply(raw)) => {
                    let Some(pod) = from_k8s_pod(&raw) else {
                        continue;
                    };
                    let key = (pod.namespace.clone(), pod.name.clone());
                    match seen.insert(key, pod.clone()) {
                        Some(old) => index.handle_pod_event(PodEvent::Modified { old, new: pod }),
                        None => index.handle_pod_event(PodEvent::Added(pod)),
                    }
                }
                Ok(watcher::Event::Delete(raw)) => {
                    let Some(pod) = from_k8s_pod(&raw) else {
                        continue;
                    };
                    let key = (pod.namespace.clone(), pod.name.clone());
                    seen.remove(&key);
                    index.handle_pod_event(PodEvent::Deleted(pod));
                }
                Ok(watcher::Event::Init | watcher::Event::InitDone) => {}
                Err(err) => {
                    warn!(error = %err, "pod watch stream error, kube retries with backoff");
                }
            }
        }
    })
}
