//! Builds the BPF filter string installed on the capture handle.
//!
//! The filter matches TCP segments whose payload starts with one of the six
//! ASCII prefixes an HTTP/1.1 request line or status line can start with,
//! using the expression `tcp[((tcp[12:1] & 0xf0) >> 2):4]` to read the data
//! offset out of the TCP header and jump straight to the first 4 payload
//! bytes — this is the same trick the original filter string uses, written
//! by hand since BPF clauses aren't expressible through `pcap`'s builder.

const HTTP_HEADS: [&[u8; 4]; 6] = [b"GET ", b"PUT ", b"POST", b"DELE", b"HEAD", b"HTTP"];

fn to_hex(bytes: &[u8; 4]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Builds the filter, excluding the cluster API server (so control-plane
/// traffic to/from it never shows up as a traced request) and, when
/// present, a `flannel0` interface whose outbound packets carry a rewritten
/// source IP that would otherwise produce bogus self-traffic matches.
pub fn build_filter(cluster_api_ip: Option<&str>, flannel0_ip: Option<&str>) -> String {
    let mut filter = HTTP_HEADS
        .iter()
        .map(|head| format!("tcp[((tcp[12:1] & 0xf0) >> 2):4]=0x{}", to_hex(head)))
        .collect::<Vec<_>>()
        .join(" or ");

    if let Some(ip) = cluster_api_ip {
        filter = format!("{filter} and not host {ip}");
    }
    if let Some(ip) = flannel0_ip {
        filter = format!("{filter} and not host {ip}");
    }

    filter
}
