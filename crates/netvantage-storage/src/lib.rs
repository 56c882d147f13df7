//! NetVantage Storage - namespaced key-value persistence.
//!
//! Every module gets a [`ScopedKvStore`] rooted at its own namespace, backed
//! by a shared [`KvStore`] implementation ([`MemoryKvStore`] by default).
//! Mutating one module's namespace never touches another's.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod kv;
mod scoped;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore};
pub use scoped::ScopedKvStore;
