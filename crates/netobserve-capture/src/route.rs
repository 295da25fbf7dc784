//! Parses `/proc/net/route` to pick the capture device whose subnet contains
//! a given pod IP, mirroring `getDefaultDevice` in the original collector.
//!
//! The kernel writes destination and mask as 8 hex characters in host byte
//! order (little-endian on every architecture Linux runs traffic-monitor on),
//! so the 4 parsed bytes must be reversed to read as a normal big-endian
//! IPv4 address.

use std::net::Ipv4Addr;

pub const DEFAULT_DEVICE: &str = "docker0";

fn parse_hex_ipv4(field: &str) -> Option<Ipv4Addr> {
    if field.len() != 8 {
        return None;
    }
    let mut bytes = [0u8; 4];
    for i in 0..4 {
        bytes[i] = u8::from_str_radix(&field[i * 2..i * 2 + 2], 16).ok()?;
    }
    bytes.reverse();
    Some(Ipv4Addr::from(bytes))
}

fn mask(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) & u32::from(mask))
}

/// Selects the most specific route matching `pod_ip` from the text of
/// `/proc/net/route`. Falls back to [`DEFAULT_DEVICE`] when nothing matches.
///
/// "Most specific" is the route whose mask has the most set bits
/// (`Ipv4Addr::count_ones` via the bits in its octets) — the original compares
/// the *sum* of the mask's octets instead, which misorders masks of equal bit
/// count but different byte distribution (e.g. `255.0.255.0` sums higher than
/// `255.255.0.0` despite being equally specific). Corrected here per the
/// REDESIGN FLAG.
pub fn select_capture_device(pod_ip: Ipv4Addr, route_table: &str) -> String {
    let mut device = DEFAULT_DEVICE.to_string();
    let mut best_bits: u32 = 0;

    for line in route_table.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            continue;
        }
        let Some(network) = parse_hex_ipv4(fields[1]) else {
            continue;
        };
        let Some(route_mask) = parse_hex_ipv4(fields[7]) else {
            continue;
        };
        if route_mask == Ipv4Addr::new(255, 255, 255, 255) {
            continue; // host route, not a subnet
        }
        if mask(pod_ip, route_mask) != network {
            continue;
        }
        let bits = u32::from(route_mask).count_ones();
        if bits > best_bits {
            best_bits = bits;
            device = fields[0].to_string();
        }
    }

    device
}

#[cfg(test)]
mod tests {
    use super::*;

    // Matches the shape of a real /proc/net/route: header line, then
    // Iface Destination Gateway Flags RefCnt Use Metric Mask MTU Window IRTT
    const ROUTE_TABLE: &str = "\
Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\tMTU\tWindow\tIRTT
docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0
eth0\t00000000\t0101A8C0\t0003\t0\t0\t0\t00000000\t0\t0\t0
eth0\t0000A8C0\t00000000\t0001\t0\t0\t0\t00FFFFFF\t0\t0\t0
";

    #[test]
    fn picks_the_matching_subnet_over_the_default_route() {
        let pod_ip = Ipv4Addr::new(172, 17, 0, 5); // 0x000011AC reversed -> 172.17.0.0/16
        assert_eq!(select_capture_device(pod_ip, ROUTE_TABLE), "docker0");
    }

    #[test]
    fn picks_the_more_specific_of_two_matching_subnets() {
        // 192.168.0.9 matches both the default route (mask 0.0.0.0, always
        // matches) and eth0's /24 (192.168.0.0/24) — the /24 wins.
        let pod_ip = Ipv4Addr::new(192, 168, 0, 9);
        assert_eq!(select_capture_device(pod_ip, ROUTE_TABLE), "eth0");
    }

    #[test]
    fn falls_back_to_default_device_when_nothing_matches() {
        let pod_ip = Ipv4Addr::new(10, 0, 0, 1);
        let table = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\tMTU\tWindow\tIRTT\n";
        assert_eq!(select_capture_device(pod_ip, table), DEFAULT_DEVICE);
    }

    #[test]
    fn skips_host_routes() {
        // A /32 host route for the pod's own address must not win over a
        // real subnet route, since it carries no usable network.
        let pod_ip = Ipv4Addr::new(172, 17, 0, 5);
        let table = format!(
            "{}{}\t000011AC\t00000000\t0005\t0\t0\t0\tFFFFFFFF\t0\t0\t0\n",
            ROUTE_TABLE, "docker0"
        );
        assert_eq!(select_capture_device(pod_ip, &table), "docker0");
    }
}
