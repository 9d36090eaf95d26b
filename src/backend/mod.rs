pub mod memory;

pub use memory::{MemoryBackend, MemoryTransaction, StoredRow};
