use std::collections::HashMap;

use crate::{Resource, ResourceHandle, ResourceKind};

type Identity = (String, String, ResourceKind);

fn label_key(namespace: &str, key: &str, value: &str) -> String {
    format!("{namespace}:{key}:{value}")
}

fn identity(resource: &ResourceHandle) -> Identity {
    (
        resource.namespace().to_string(),
        resource.name().to_string(),
        resource.kind(),
    )
}

/// Label-keyed reverse index: `"<namespace>:<key>:<value>"` to the
/// per-kind bucket of resources carrying that label/selector entry (§4.1).
#[derive(Default)]
pub struct SelectorIndex {
    by_label: HashMap<String, HashMap<ResourceKind, Vec<ResourceHandle>>>,
}

impl SelectorIndex {
    /// Index `resource` under each `(namespace, key, value)` of its selector.
    pub fn add(&mut self, resource: &ResourceHandle) {
        for (key, value) in resource.selector() {
            let label_key = label_key(resource.namespace(), key, value);
            self.by_label
                .entry(label_key)
                .or_default()
                .entry(resource.kind())
                .or_default()
                .push(resource.clone());
        }
    }

    /// Remove `resource` from each bucket its selector placed it in, by
    /// `(namespace, name)` equality within the resource's own kind.
    pub fn remove(&mut self, resource: &ResourceHandle) {
        for (key, value) in resource.selector() {
            let label_key = label_key(resource.namespace(), key, value);
            if let Some(kind_map) = self.by_label.get_mut(&label_key)
                && let Some(bucket) = kind_map.get_mut(&resource.kind())
            {
                bucket.retain(|existing| existing.name() != resource.name());
            }
        }
    }

    /// Given `query`'s selector, find resources of `target_kind` in a
    /// selector/label match with it (§4.1's "Match algorithm").
    ///
    /// If any selector key of `query` has no entry in the index at all, the
    /// match fails immediately with an empty result — this mirrors the
    /// source's early-return-on-miss behavior rather than skipping just that
    /// key.
    #[must_use]
    pub fn match_resources(
        &self,
        query: &ResourceHandle,
        target_kind: ResourceKind,
    ) -> Vec<ResourceHandle> {
        let mut tally: HashMap<Identity, (ResourceHandle, usize)> = HashMap::new();

        for (key, value) in query.selector() {
            let label_key = label_key(query.namespace(), key, value);
            let Some(kind_map) = self.by_label.get(&label_key) else {
                return Vec::new();
            };
            if let Some(candidates) = kind_map.get(&target_kind) {
                for candidate in candidates {
                    let entry = tally
                        .entry(identity(candidate))
                        .or_insert_with(|| (candidate.clone(), 0));
                    entry.1 += 1;
                }
            }
        }

        let return_parent = query.kind() > target_kind;
        tally
            .into_values()
            .filter(|(handle, count)| {
                let required = if return_parent {
                    handle.selector().len()
                } else {
                    query.selector().len()
                };
                *count == required
            })
            .map(|(handle, _)| handle)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Controller, ControllerKind, Pod, Service};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn pod_matches_service_by_shared_label() {
        let mut index = SelectorIndex::default();

        let pod = Arc::new(
            Pod::new(
                "ns",
                "pod-a",
                "1",
                "10.1.1.1",
                "10.0.0.1",
                false,
                labels(&[("app", "a")]),
            )
            .unwrap(),
        );
        let service = Arc::new(Service {
            namespace: "ns".into(),
            name: "svc".into(),
            resource_version: "1".into(),
            cluster_ip: "11.0.0.1".into(),
            selector: labels(&[("app", "a")]),
            ports: vec![],
        });

        index.add(&ResourceHandle::Pod(pod.clone()));
        index.add(&ResourceHandle::Service(service.clone()));

        let matched_pods =
            index.match_resources(&ResourceHandle::Service(service.clone()), ResourceKind::Pod);
        assert_eq!(matched_pods.len(), 1);
        assert_eq!(matched_pods[0].as_pod().unwrap().name, "pod-a");

        let matched_services = index.match_resources(
            &ResourceHandle::Pod(pod.clone()),
            ResourceKind::Service,
        );
        assert_eq!(matched_services.len(), 1);
        assert_eq!(matched_services[0].as_service().unwrap().name, "svc");
    }

    #[test]
    fn parent_match_requires_every_parent_selector_key() {
        let mut index = SelectorIndex::default();

        let pod = Arc::new(
            Pod::new(
                "ns",
                "pod-a",
                "1",
                "10.1.1.1",
                "10.0.0.1",
                false,
                labels(&[("app", "a")]),
            )
            .unwrap(),
        );
        let controller = Arc::new(Controller {
            namespace: "ns".into(),
            name: "deploy".into(),
            kind: ControllerKind::Deployment,
            selector: labels(&[("app", "a"), ("tier", "backend")]),
            container_ports: vec![8080],
        });

        index.add(&ResourceHandle::Pod(pod.clone()));
        index.add(&ResourceHandle::Controller(controller));

        // pod only carries `app=a`, not `tier=backend`, so it should not
        // satisfy the controller's full selector.
        let matched = index.match_resources(&ResourceHandle::Pod(pod), ResourceKind::Controller);
        assert!(matched.is_empty());
    }

    #[test]
    fn remove_clears_all_selector_entries() {
        let mut index = SelectorIndex::default();
        let pod = Arc::new(
            Pod::new(
                "ns",
                "pod-a",
                "1",
                "10.1.1.1",
                "10.0.0.1",
                false,
                labels(&[("app", "a"), ("tier", "backend")]),
            )
            .unwrap(),
        );
        let handle = ResourceHandle::Pod(pod.clone());
        index.add(&handle);
        index.remove(&handle);

        let service = Arc::new(Service {
            namespace: "ns".into(),
            name: "svc".into(),
            resource_version: "1".into(),
            cluster_ip: "11.0.0.1".into(),
            selector: labels(&[("app", "a")]),
            ports: vec![],
        });
        index.add(&ResourceHandle::Service(service.clone()));
        let matched =
            index.match_resources(&ResourceHandle::Service(service), ResourceKind::Pod);
        assert!(matched.is_empty());
    }

    #[test]
    fn missing_selector_key_fails_the_whole_match() {
        let index = SelectorIndex::default();
        let service = ResourceHandle::Service(Arc::new(Service {
            namespace: "ns".into(),
            name: "svc".into(),
            resource_version: "1".into(),
            cluster_ip: "11.0.0.1".into(),
            selector: labels(&[("app", "a")]),
            ports: vec![],
        }));
        assert!(index.match_resources(&service, ResourceKind::Pod).is_empty());
    }
}
