//! Commonly used types for convenient import.

pub use crate::{KvStore, MemoryKvStore, ScopedKvStore, StorageError, StorageResult};
