//! Top-level packet handler: resolves source/destination workloads, pairs
//! requests with responses via the correlation engine, and publishes
//! metrics for paired exchanges (§4.5).

mod handler;

pub use handler::{LocalPodIpRange, PacketHandler};
