use std::net::Ipv4Addr;

/// A classified TCP segment: its five-tuple, capture timestamp, TCP
/// timestamp option (if present), and application-layer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Source IPv4 address.
    pub src_ip: Ipv4Addr,
    /// Destination IPv4 address.
    pub dst_ip: Ipv4Addr,
    /// Source TCP port.
    pub src_port: u16,
    /// Destination TCP port.
    pub dst_port: u16,
    /// Capture timestamp in nanoseconds since the epoch.
    pub timestamp_nanos: i64,
    /// The TCP options' third entry, taken positionally as an opaque
    /// identifier rather than matched by option kind — matching the source,
    /// which indexes `tcp.Options[2]` without checking its kind byte. In
    /// practice this lands on the Timestamps option given typical stacks'
    /// canonical option ordering (MSS, NOP, NOP, Timestamps).
    pub tcp_timestamp: Option<Vec<u8>>,
    /// Application-layer payload bytes.
    pub payload: Vec<u8>,
}

impl Packet {
    /// The payload interpreted as UTF-8, for preamble matching. `None` if
    /// the payload is not valid UTF-8.
    #[must_use]
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
