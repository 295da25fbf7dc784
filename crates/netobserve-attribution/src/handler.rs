use std::sync::Arc;

use netobserve_classify::{Packet, Preamble, match_preamble};
use netobserve_core::ResourceIndex;
use netobserve_correlate::{CorrelationEngine, RequestHandle, RequestRecord};
use netobserve_telemetry::{RequestLabels, record_request};

/// Whether an IP falls inside the capture device's local pod-IP subnet,
/// implemented by the capture driver adapter (§4.6). Kept as a trait here so
/// this crate never depends on `pcap`.
pub trait LocalPodIpRange {
    fn contains(&self, ip: &str) -> bool;
}

/// Resolves, pairs, and publishes metrics for one classified packet at a
/// time, on the single consumer thread (§4.5, §5).
pub struct PacketHandler {
    resources: Arc<ResourceIndex>,
    local_range: Arc<dyn LocalPodIpRange + Send + Sync>,
}

impl PacketHandler {
    #[must_use]
    pub fn new(
        resources: Arc<ResourceIndex>,
        local_range: Arc<dyn LocalPodIpRange + Send + Sync>,
    ) -> Self {
        Self {
            resources,
            local_range,
        }
    }

    /// Handle one packet. The packet's addresses are post-NAT for requests
    /// and pre-NAT for responses, per the cluster's DNAT rules (§4.5).
    pub fn handle(&self, engine: &mut CorrelationEngine, packet: &Packet) {
        let src_ip = packet.src_ip.to_string();
        let dst_ip = packet.dst_ip.to_string();

        let src_pod = self.resources.pod_by_ip(&src_ip);
        let dst_pod = self.resources.pod_by_ip(&dst_ip);
        if src_pod.as_ref().is_some_and(|p| p.is_system_namespace())
            || dst_pod.as_ref().is_some_and(|p| p.is_system_namespace())
        {
            return;
        }

        let tcp_timestamp = packet.tcp_timestamp.as_deref().unwrap_or(&[]);

        let (handle, duplicate) = if dst_pod.is_none() {
            engine.get_request("", u32::from(packet.dst_port), &src_ip, u32::from(packet.src_port), tcp_timestamp)
        } else {
            engine.get_request(&dst_ip, u32::from(packet.dst_port), &src_ip, u32::from(packet.src_port), tcp_timestamp)
        };
        if duplicate {
            tracing::debug!("duplicate response packet, dropped");
            return;
        }
        if let Some(handle) = handle {
            if src_pod.is_some() && dst_pod.is_some() && !self.local_range.contains(&dst_ip) {
                tracing::debug!("receiver-side half of cross-node exchange, dropped");
                return;
            }
            self.accept_response(engine, handle, packet);
            return;
        }

        if let Some(service) = self.resources.service_by_cluster_ip(&src_ip)
            && let Some(service_port) = service.port_by_number(packet.src_port)
            && let Some(target_port) = service_port.target_port
        {
            for pod in self.resources.pods_for_service(&service) {
                let Some(controller) = self.resources.controller_for_pod(&pod) else {
                    continue;
                };
                if !controller.has_container_port(target_port) {
                    continue;
                }
                let (handle, duplicate) = if dst_pod.is_none() {
                    engine.get_request("", u32::from(packet.dst_port), &pod.pod_ip, u32::from(target_port), tcp_timestamp)
                } else {
                    engine.get_request(&dst_ip, u32::from(packet.dst_port), &pod.pod_ip, u32::from(target_port), tcp_timestamp)
                };
                if duplicate {
                    return;
                }
                if let Some(handle) = handle {
                    self.accept_response(engine, handle, packet);
                    return;
                }
            }
        }

        let Some(dst_pod) = &dst_pod else { return };
        let Some(controller) = self.resources.controller_for_pod(dst_pod) else {
            return;
        };
        if !controller.has_container_port(packet.dst_port) {
            return;
        }
        let Some(payload) = packet.payload_str() else {
            return;
        };
        let Some(Preamble::Request { method, url }) = match_preamble(payload) else {
            return;
        };

        let (src, src_ns) = match &src_pod {
            Some(pod) => match self.resources.controller_for_pod(pod) {
                Some(src_controller) => (src_controller.name.clone(), src_controller.namespace.clone()),
                None => (String::new(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        engine.add_request(RequestRecord {
            src_ip,
            src_port: u32::from(packet.src_port),
            dst_ip,
            dst_port: u32::from(packet.dst_port),
            src,
            src_ns,
            dst: controller.name.clone(),
            dst_ns: controller.namespace.clone(),
            method,
            url,
            status: None,
            request_timestamp_nanos: packet.timestamp_nanos,
            response_timestamp_nanos: None,
            tcp_request_timestamp: tcp_timestamp.to_vec(),
            tcp_response_timestamp: None,
        });
    }

    fn accept_response(&self, engine: &mut CorrelationEngine, handle: RequestHandle, packet: &Packet) {
        let Some(payload) = packet.payload_str() else {
            return;
        };
        let Some(Preamble::Response { status }) = match_preamble(payload) else {
            return;
        };
        let tcp_timestamp = packet.tcp_timestamp.clone().unwrap_or_default();
        if !engine.set_response(handle, status, packet.timestamp_nanos, tcp_timestamp) {
            return;
        }
        let Some(record) = engine.record(handle) else {
            return;
        };
        let Some(duration) = record.duration_seconds() else {
            return;
        };
        record_request(
            &RequestLabels {
                source: &record.src,
                source_ns: &record.src_ns,
                destination: &record.dst,
                destination_ns: &record.dst_ns,
                method: &record.method,
                url: &record.url,
            },
            duration,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::net::Ipv4Addr;

    use netobserve_core::{Controller, ControllerKind, PodEvent, Service, ServicePort};

    struct AlwaysLocal;
    impl LocalPodIpRange for AlwaysLocal {
        fn contains(&self, _ip: &str) -> bool {
            true
        }
    }

    struct NeverLocal;
    impl LocalPodIpRange for NeverLocal {
        fn contains(&self, _ip: &str) -> bool {
            false
        }
    }

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn packet(src: &str, src_port: u16, dst: &str, dst_port: u16, payload: &[u8]) -> Packet {
        Packet {
            src_ip: src.parse::<Ipv4Addr>().unwrap(),
            dst_ip: dst.parse::<Ipv4Addr>().unwrap(),
            src_port,
            dst_port,
            timestamp_nanos: 1_000_000_000,
            tcp_timestamp: Some(vec![1, 2, 3]),
            payload: payload.to_vec(),
        }
    }

    fn setup() -> (Arc<ResourceIndex>, PacketHandler) {
        let resources = Arc::new(ResourceIndex::new(vec![]));
        resources.handle_pod_event(PodEvent::Added(
            netobserve_core::Pod::new("ns", "client", "1", "10.1.1.1", "10.0.0.1", false, labels(&[("app", "client")])).unwrap(),
        ));
        resources.handle_pod_event(PodEvent::Added(
            netobserve_core::Pod::new("ns", "server", "1", "10.1.1.2", "10.0.0.2", false, labels(&[("app", "server")])).unwrap(),
        ));
        resources.controller_added(Controller {
            namespace: "ns".into(),
            name: "client-deploy".into(),
            kind: ControllerKind::Deployment,
            selector: labels(&[("app", "client")]),
            container_ports: vec![0],
        });
        resources.controller_added(Controller {
            namespace: "ns".into(),
            name: "server-deploy".into(),
            kind: ControllerKind::Deployment,
            selector: labels(&[("app", "server")]),
            container_ports: vec![8080],
        });
        let handler = PacketHandler::new(resources.clone(), Arc::new(AlwaysLocal));
        (resources, handler)
    }

    #[test]
    fn request_then_response_pairs_and_publishes() {
        let (_resources, handler) = setup();
        let mut engine = CorrelationEngine::new();

        let request = packet("10.1.1.1", 40000, "10.1.1.2", 8080, b"GET /x HTTP/1.1\r\n");
        handler.handle(&mut engine, &request);

        // peek with the same argument convention the handler itself uses:
        // a would-be response's own destination/source, in that order.
        let (found, _) = engine.get_request("10.1.1.1", 40000, "10.1.1.2", 8080, &[]);
        let handle = found.expect("request indexed");

        let mut response = packet("10.1.1.2", 8080, "10.1.1.1", 40000, b"HTTP/1.1 200 OK\r\n");
        response.tcp_timestamp = Some(vec![9, 9, 9]);
        handler.handle(&mut engine, &response);

        let record = engine.record(handle).unwrap();
        assert_eq!(record.status.as_deref(), Some("200"));
        assert_eq!(record.dst, "server-deploy");
    }

    #[test]
    fn system_namespace_pod_is_ignored() {
        let (resources, handler) = setup();
        resources.handle_pod_event(PodEvent::Added(
            netobserve_core::Pod::new("kube-system", "dns", "1", "10.1.1.9", "10.0.0.9", false, BTreeMap::new()).unwrap(),
        ));
        let mut engine = CorrelationEngine::new();
        let request = packet("10.1.1.9", 1, "10.1.1.2", 8080, b"GET / HTTP/1.1\r\n");
        handler.handle(&mut engine, &request);
        let (found, _) = engine.get_request("10.1.1.9", 1, "10.1.1.2", 8080, &[]);
        assert!(found.is_none());
    }

    #[test]
    fn cross_node_response_with_unknown_local_range_is_dropped() {
        let resources = Arc::new(ResourceIndex::new(vec![]));
        resources.handle_pod_event(PodEvent::Added(
            netobserve_core::Pod::new("ns", "client", "1", "10.1.1.1", "10.0.0.1", false, labels(&[("app", "client")])).unwrap(),
        ));
        resources.handle_pod_event(PodEvent::Added(
            netobserve_core::Pod::new("ns", "server", "1", "10.1.1.2", "10.0.0.2", false, labels(&[("app", "server")])).unwrap(),
        ));
        resources.controller_added(Controller {
            namespace: "ns".into(),
            name: "server-deploy".into(),
            kind: ControllerKind::Deployment,
            selector: labels(&[("app", "server")]),
            container_ports: vec![8080],
        });
        let handler = PacketHandler::new(resources.clone(), Arc::new(NeverLocal));
        let mut engine = CorrelationEngine::new();

        engine.add_request(RequestRecord {
            src_ip: "10.1.1.1".into(),
            src_port: 40000,
            dst_ip: "10.1.1.2".into(),
            dst_port: 8080,
            src: "client".into(),
            src_ns: "ns".into(),
            dst: "server".into(),
            dst_ns: "ns".into(),
            method: "GET".into(),
            url: "/x".into(),
            status: None,
            request_timestamp_nanos: 0,
            response_timestamp_nanos: None,
            tcp_request_timestamp: vec![1, 2, 3],
            tcp_response_timestamp: None,
        });

        let response = packet("10.1.1.2", 8080, "10.1.1.1", 40000, b"HTTP/1.1 200 OK\r\n");
        handler.handle(&mut engine, &response);

        let (found, _) = engine.get_request("10.1.1.1", 40000, "10.1.1.2", 8080, &[1, 2, 3]);
        let record = engine.record(found.unwrap()).unwrap();
        assert!(record.status.is_none(), "cross-node receiver half must not pair");
    }

    #[test]
    fn service_ip_response_is_inverted_to_backing_pod() {
        let (resources, handler) = setup();
        resources.service_added(Service {
            namespace: "ns".into(),
            name: "server-svc".into(),
            resource_version: "1".into(),
            cluster_ip: "11.0.0.1".into(),
            selector: labels(&[("app", "server")]),
            ports: vec![ServicePort {
                name: "http".into(),
                port: 80,
                target_port: Some(8080),
            }],
        });

        let mut engine = CorrelationEngine::new();
        // the captured request is post-DNAT: its destination is already the
        // backing pod's real address, not the service's cluster IP.
        engine.add_request(RequestRecord {
            src_ip: "10.1.1.1".into(),
            src_port: 40000,
            dst_ip: "10.1.1.2".into(),
            dst_port: 8080,
            src: "client-deploy".into(),
            src_ns: "ns".into(),
            dst: "server-deploy".into(),
            dst_ns: "ns".into(),
            method: "GET".into(),
            url: "/x".into(),
            status: None,
            request_timestamp_nanos: 0,
            response_timestamp_nanos: None,
            tcp_request_timestamp: vec![1, 2, 3],
            tcp_response_timestamp: None,
        });

        let (found, _) = engine.get_request("10.1.1.1", 40000, "10.1.1.2", 8080, &[]);
        let handle = found.expect("request indexed");

        // response's source IP is the service cluster IP, rewritten back
        // from the backing pod's real IP by the kernel before capture.
        let response = packet("11.0.0.1", 80, "10.1.1.1", 40000, b"HTTP/1.1 200 OK\r\n");
        handler.handle(&mut engine, &response);

        let record = engine.record(handle).unwrap();
        assert_eq!(record.status.as_deref(), Some("200"));
    }
}
