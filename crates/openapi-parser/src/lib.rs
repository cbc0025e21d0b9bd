//! # openapi-parser
//!
//! OpenAPI 3.x and Swagger 2.0 parser for api-bridge.
//! Flattens a spec into a list of endpoints, resolves the API base URL and
//! provides keyword search and path-template matching over the result.

mod types;
mod parser;
mod search;
mod error;

pub use types::*;
pub use parser::OpenApiParser;
pub use search::{EndpointMatch, EndpointSearch};
pub use error::{ParseError, ParseResult};
