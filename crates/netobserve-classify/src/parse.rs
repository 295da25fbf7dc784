use std::net::Ipv4Addr;

use tracing::warn;

use crate::Packet;

const TCP_PROTOCOL: u8 = 6;

/// Parse an IPv4 packet carrying TCP (link-layer header already stripped by
/// the capture adapter) into a [`Packet`]. Rejects anything that is not
/// IPv4-over-TCP, logging a warning, per §4.3.
#[must_use]
pub fn classify_ip_packet(bytes: &[u8], timestamp_nanos: i64) -> Option<Packet> {
    let ipv4 = parse_ipv4_header(bytes)?;
    if ipv4.protocol != TCP_PROTOCOL {
        warn!(protocol = ipv4.protocol, "non-TCP packet, dropped");
        return None;
    }

    let tcp_bytes = bytes.get(ipv4.header_len..)?;
    let tcp = parse_tcp_header(tcp_bytes)?;

    let payload_offset = tcp.header_len;
    let payload = tcp_bytes.get(payload_offset..).unwrap_or(&[]).to_vec();

    const TIMESTAMPS_KIND: u8 = 8;
    let tcp_timestamp = tcp
        .options
        .into_iter()
        .find(|(kind, _)| *kind == TIMESTAMPS_KIND)
        .map(|(_, data)| data);

    Some(Packet {
        src_ip: ipv4.src,
        dst_ip: ipv4.dst,
        src_port: tcp.src_port,
        dst_port: tcp.dst_port,
        timestamp_nanos,
        tcp_timestamp,
        payload,
    })
}

struct Ipv4Header {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: u8,
    header_len: usize,
}

fn parse_ipv4_header(bytes: &[u8]) -> Option<Ipv4Header> {
    let first = *bytes.first()?;
    let version = first >> 4;
    if version != 4 {
        warn!(version, "non-IPv4 packet, dropped");
        return None;
    }
    let ihl = (first & 0x0f) as usize;
    let header_len = ihl * 4;
    if header_len < 20 || bytes.len() < header_len {
        warn!("truncated IPv4 header, dropped");
        return None;
    }

    let protocol = bytes[9];
    let src = Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]);
    let dst = Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]);

    Some(Ipv4Header {
        src,
        dst,
        protocol,
        header_len,
    })
}

struct TcpHeader {
    src_port: u16,
    dst_port: u16,
    header_len: usize,
    options: Vec<(u8, Vec<u8>)>,
}

fn parse_tcp_header(bytes: &[u8]) -> Option<TcpHeader> {
    if bytes.len() < 20 {
        warn!("truncated TCP header, dropped");
        return None;
    }
    let src_port = u16::from_be_bytes([bytes[0], bytes[1]]);
    let dst_port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let data_offset = (bytes[12] >> 4) as usize;
    let header_len = data_offset * 4;
    if header_len < 20 || bytes.len() < header_len {
        warn!("truncated TCP header, dropped");
        return None;
    }

    let options = parse_tcp_options(&bytes[20..header_len]);

    Some(TcpHeader {
        src_port,
        dst_port,
        header_len,
        options,
    })
}

/// Parse TCP options into `(kind, data)` pairs (data with the kind/length
/// bytes stripped), skipping end-of-list/NOP padding. Options are identified
/// by kind rather than position: NOP padding (kind 1) is common and variable
/// in count ahead of any later option (e.g. the canonical `NOP, NOP,
/// Timestamps` layout), so a fixed index into the result would not reliably
/// land on a given option kind.
fn parse_tcp_options(mut bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut options = Vec::new();
    while let Some(&kind) = bytes.first() {
        match kind {
            0 => break,
            1 => {
                bytes = &bytes[1..];
            }
            _ => {
                let Some(&len) = bytes.get(1) else { break };
                let len = len as usize;
                if len < 2 || bytes.len() < len {
                    break;
                }
                options.push((kind, bytes[2..len].to_vec()));
                bytes = &bytes[len..];
            }
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_tcp_packet(payload: &[u8], options: &[u8]) -> Vec<u8> {
        let mut tcp_header = vec![0u8; 20];
        tcp_header[0..2].copy_from_slice(&1234u16.to_be_bytes());
        tcp_header[2..4].copy_from_slice(&80u16.to_be_bytes());
        let data_offset_words = 5 + options.len().div_ceil(4);
        tcp_header[12] = (data_offset_words as u8) << 4;
        tcp_header.extend_from_slice(options);
        while tcp_header.len() < data_offset_words * 4 {
            tcp_header.push(0);
        }
        tcp_header.extend_from_slice(payload);

        let total_len = 20 + tcp_header.len();
        let mut ip_header = vec![0u8; 20];
        ip_header[0] = 0x45;
        ip_header[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
        ip_header[9] = 6; // TCP
        ip_header[12..16].copy_from_slice(&[10, 1, 1, 1]);
        ip_header[16..20].copy_from_slice(&[10, 1, 1, 2]);

        let mut packet = ip_header;
        packet.extend_from_slice(&tcp_header);
        packet
    }

    #[test]
    fn parses_five_tuple_and_payload() {
        let packet = ipv4_tcp_packet(b"GET /x HTTP/1.1\r\n", &[]);
        let classified = classify_ip_packet(&packet, 1000).unwrap();
        assert_eq!(classified.src_ip, Ipv4Addr::new(10, 1, 1, 1));
        assert_eq!(classified.dst_ip, Ipv4Addr::new(10, 1, 1, 2));
        assert_eq!(classified.src_port, 1234);
        assert_eq!(classified.dst_port, 80);
        assert_eq!(classified.payload_str().unwrap(), "GET /x HTTP/1.1\r\n");
    }

    #[test]
    fn extracts_timestamps_option_by_kind_after_nop_padding() {
        // NOP, NOP, Timestamps(kind=8, len=10, 8 bytes data)
        let mut options = vec![1, 1, 8, 10];
        options.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let packet = ipv4_tcp_packet(b"", &options);
        let classified = classify_ip_packet(&packet, 0).unwrap();
        assert_eq!(
            classified.tcp_timestamp,
            Some(vec![1, 2, 3, 4, 5, 6, 7, 8])
        );
    }

    #[test]
    fn no_timestamps_option_yields_none() {
        // NOP, NOP, MSS(kind=2, len=4, 2 bytes data) — no Timestamps option present.
        let options = vec![1, 1, 2, 4, 0x05, 0xb4];
        let packet = ipv4_tcp_packet(b"", &options);
        let classified = classify_ip_packet(&packet, 0).unwrap();
        assert_eq!(classified.tcp_timestamp, None);
    }

    #[test]
    fn rejects_non_tcp_protocol() {
        let mut packet = ipv4_tcp_packet(b"", &[]);
        packet[9] = 17; // UDP
        assert!(classify_ip_packet(&packet, 0).is_none());
    }

    #[test]
    fn rejects_non_ipv4_version() {
        let mut packet = ipv4_tcp_packet(b"", &[]);
        packet[0] = 0x65; // version 6
        assert!(classify_ip_packet(&packet, 0).is_none());
    }
}
