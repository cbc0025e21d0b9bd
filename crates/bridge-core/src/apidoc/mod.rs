//! Registered API documents

mod registry;
mod types;

pub use registry::ApiDocRegistry;
pub use types::{ApiDoc, EndpointHit, StoredApiDoc};
