pub mod memory;

pub use memory::{FetchKind, MemoryStore};
