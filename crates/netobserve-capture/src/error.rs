#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read route table: {0}")]
    RouteTable(#[from] std::io::Error),

    #[error("pcap error: {0}")]
    Pcap(#[from] pcap::Error),

    #[error("no capture device named {0:?} was found")]
    DeviceNotFound(String),

    #[error("capture device {0:?} has no IPv4 address")]
    NoIpv4Address(String),
}
