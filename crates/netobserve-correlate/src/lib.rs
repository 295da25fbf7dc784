//! Request/response correlation: pairs captured TCP segments carrying HTTP
//! requests with the segments carrying their responses.

mod arena;
mod engine;
mod record;

pub use engine::{CorrelationEngine, RequestHandle};
pub use record::RequestRecord;
