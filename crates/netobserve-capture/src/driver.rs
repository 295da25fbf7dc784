use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};

use ipnetwork::Ipv4Network;
use netobserve_attribution::LocalPodIpRange;
use netobserve_classify::{Packet, classify_ip_packet};
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::filter::build_filter;
use crate::route::select_capture_device;

/// pcap's "any" pseudo-device prefixes every packet with a 16-byte Linux
/// cooked-capture (SLL) header instead of a real link-layer header; bytes
/// 14..16 carry the ethertype, same position as real Ethernet frames.
const LINUX_SLL_HEADER_LEN: usize = 16;
const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];

fn strip_link_layer(data: &[u8]) -> Option<&[u8]> {
    if data.len() < LINUX_SLL_HEADER_LEN {
        return None;
    }
    if data[14..16] != ETHERTYPE_IPV4 {
        return None;
    }
    Some(&data[LINUX_SLL_HEADER_LEN..])
}

/// This node's local IPv4 addresses across all interfaces `pcap` reports,
/// used to seed the resource index's local-pod-IP discovery (`node_ips` in
/// `NewK8sResourceManager`'s own `net.Interfaces()` loop).
pub fn local_ipv4_addresses() -> Result<Vec<String>, CaptureError> {
    Ok(pcap::Device::list()?
        .iter()
        .filter_map(first_ipv4)
        .map(|ip| ip.to_string())
        .collect())
}

fn first_ipv4(device: &pcap::Device) -> Option<Ipv4Addr> {
    device.addresses.iter().find_map(|addr| match addr.addr {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    })
}

fn ipv4_network_of(device: &pcap::Device) -> Option<Ipv4Network> {
    let addr = first_ipv4(device)?;
    let netmask = device.addresses.iter().find_map(|a| match (a.addr, a.netmask) {
        (IpAddr::V4(v4), Some(IpAddr::V4(m))) if v4 == addr => Some(m),
        _ => None,
    })?;
    let prefix = u32::from(netmask).count_ones() as u8;
    let network = Ipv4Addr::from(u32::from(addr) & u32::from(netmask));
    Ipv4Network::new(network, prefix).ok()
}

/// Owns device selection, the composed BPF filter, and the `pcap` handle
/// lifecycle (§4.6). One driver is built per process at startup, against the
/// pod's own IP and (once learned) the cluster API server's IP.
pub struct CaptureDriver {
    filter: String,
    local_range: Option<Ipv4Network>,
}

impl CaptureDriver {
    /// Reads `/proc/net/route` and the host's interface list to pick a
    /// capture device and compose the BPF filter. Does not open the capture
    /// handle itself — that happens lazily in [`CaptureDriver::run`] so
    /// filter construction stays testable without a live `pcap` session.
    pub fn new(pod_ip: Ipv4Addr, cluster_api_ip: Option<&str>) -> Result<Self, CaptureError> {
        let route_table = std::fs::read_to_string("/proc/net/route")?;
        let device_name = select_capture_device(pod_ip, &route_table);

        let devices = pcap::Device::list()?;
        let local_range = devices
            .iter()
            .find(|d| d.name == device_name)
            .and_then(ipv4_network_of);
        if local_range.is_none() {
            warn!(device = %device_name, "selected capture device has no usable IPv4 address");
        }

        let flannel0_ip = devices
            .iter()
            .find(|d| d.name == "flannel0")
            .and_then(first_ipv4)
            .map(|ip| ip.to_string());

        let filter = build_filter(cluster_api_ip, flannel0_ip.as_deref());
        debug!(device = %device_name, %filter, "capture device and filter selected");

        Ok(Self { filter, local_range })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Opens the capture handle on the `any` pseudo-device, installs the
    /// filter, and delivers classified packets to `on_packet` until `stop`
    /// is set. A 1-second read timeout bounds how long shutdown takes to
    /// notice `stop`, since a blocked `pcap` read can't otherwise be
    /// interrupted from another thread.
    pub fn run(
        &self,
        stop: &AtomicBool,
        mut on_packet: impl FnMut(Packet),
    ) -> Result<(), CaptureError> {
        let mut capture = pcap::Capture::from_device("any")?
            .promisc(false)
            .snaplen(1024)
            .timeout(1_000)
            .open()?;
        capture.filter(&self.filter, true)?;

        while !stop.load(Ordering::Relaxed) {
            match capture.next_packet() {
                Ok(raw) => {
                    let Some(ip_payload) = strip_link_layer(raw.data) else {
                        continue;
                    };
                    let timestamp_nanos = raw.header.ts.tv_sec as i64 * 1_000_000_000
                        + raw.header.ts.tv_usec as i64 * 1_000;
                    if let Some(packet) = classify_ip_packet(ip_payload, timestamp_nanos) {
                        on_packet(packet);
                    }
                }
                Err(pcap::Error::TimeoutExpired) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl LocalPodIpRange for CaptureDriver {
    /// Meaningful only when the capture device's subnet equals the
    /// cluster's pod CIDR, true of flat-network CNIs bridging through the
    /// selected device, not guaranteed under every overlay network.
    fn contains(&self, ip: &str) -> bool {
        let Some(network) = self.local_range else {
            return false;
        };
        let Ok(parsed) = ip.parse::<Ipv4Addr>() else {
            return false;
        };
        network.contains(parsed)
    }
}
