//! Capture driver adapter (§4.6): selects a capture device, composes the BPF
//! filter, and turns a live `pcap` session into a stream of classified
//! packets for the correlation/attribution layer.

mod driver;
mod error;
mod filter;
mod route;

pub use driver::{CaptureDriver, local_ipv4_addresses};
pub use error::CaptureError;
pub use filter::build_filter;
pub use route::{DEFAULT_DEVICE, select_capture_device};
