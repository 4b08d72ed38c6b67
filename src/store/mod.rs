//! Storage layer: sharded blob store, cache index, eviction

mod blob;
mod evict;
mod index;

pub use blob::{Blob, BlobStore};
pub use evict::EvictionManager;
pub use index::{CacheIndex, EntryMeta, IndexEntry};
