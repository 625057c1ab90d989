pub mod chroma;
pub mod memory;

pub use chroma::{ChromaStore, DEFAULT_COLLECTION};
pub use memory::MemoryStore;
