//! Outbound HTTP calls

mod executor;
mod response;

pub use executor::{OutboundRequest, RequestExecutor};
pub use response::{ApiResponse, Timing};
