//! `stock-store`: the persistence substrate of a content-addressed state
//! database.
//!
//! A [`stock::Stock`] is a durable, index-addressed pool of fixed-size
//! records with an explicit free list — a persistent analogue of a memory
//! allocator: `new` returns a fresh identifier, `get`/`set` dereference it,
//! `delete` returns the slot for later reuse. [`stock::FileStock`] is the
//! durable, file-backed implementation; [`stock::MemoryStock`] is an
//! in-memory oracle used to differentially test it via
//! [`stock::ShadowStock`]. [`stock::CachedStock`] adds a write-through LRU
//! in front of any stock, and [`stock::SyncedStock`] makes any stock safe
//! under concurrent callers.
//!
//! [`checkpoint::CheckpointCoordinator`] drives a set of participants
//! through a two-phase commit to capture globally consistent restore
//! points, and [`shared_handle::SharedObject`] gives the trie layer that
//! consumes a stock a four-mode (read/view/hash/write) access protocol for
//! nodes held in memory.
//!
//! Out of scope (external collaborators): Merkle-Patricia trie
//! node types, RLP codecs, witness proofs, archive export/import, CLI
//! commands.

pub mod buffered_file;
pub mod checkpoint;
pub mod config;
#[cfg(test)]
pub mod digest;
pub mod error;
pub mod fs;
pub mod free_list;
pub mod index;
pub mod index_set;
pub mod prelude;
pub mod shared_handle;
pub mod stock;
#[cfg(test)]
pub mod test_util;
pub mod value;
