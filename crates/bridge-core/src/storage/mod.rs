//! Storage backends for credentials and API docs
//!
//! Two backends are provided:
//! 1. JSON file in the data directory (default)
//! 2. In-memory map (tests, ephemeral sessions)

mod traits;
mod json_file;
mod memory;

pub use traits::Storage;
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
