//! Request authentication
//!
//! - `cache`: in-memory tokens for Smart Bearer credentials
//! - `lifecycle`: login, validity probe and refresh
//! - `apply`: header injection per credential scheme

mod apply;
mod cache;
mod lifecycle;
mod path;

pub use cache::{CachedToken, TokenCache};
pub use lifecycle::TokenManager;
pub use path::get_value_by_path;
