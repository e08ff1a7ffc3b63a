//! The `Stock` abstraction: a durable, index-addressed pool of fixed-size
//! records with an explicit free list, and the wrappers that compose around
//! any implementation of it.
//!
//! Clients drive a [`Stock`] through `new/get/set/delete/flush/close`. A
//! stock may be wrapped `CachedStock -> SyncedStock -> ShadowStock` to add a
//! write-through cache, thread-safety, and differential-testing
//! instrumentation respectively.

mod cached_stock;
pub use cached_stock::*;

mod file_stock;
pub use file_stock::*;

mod memory_stock;
pub use memory_stock::*;

mod shadow_stock;
pub use shadow_stock::*;

mod synced_stock;
pub use synced_stock::*;

use crate::error::StockError;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;

/// The external contract every stock implementation and wrapper honours.
///
/// `get`/`set` take `&mut self` because a bare `Stock` is single-owner —
/// [`SyncedStock`] is what adds safe multi-threaded access on top.
pub trait Stock<I: FixedWidthInt, V> {
    /// Returns a fresh index: the top of the free list if non-empty,
    /// otherwise a newly allocated one.
    fn new_id(&mut self) -> Result<I, StockError>;

    /// Out-of-range reads return the zero value, never an error.
    fn get(&mut self, i: I) -> Result<V, StockError>;

    /// Fails with `IndexOutOfRange` when `i` is not a previously allocated
    /// (and not yet deleted) index.
    fn set(&mut self, i: I, v: V) -> Result<(), StockError>;

    /// Pushes `i` onto the free list. Out-of-range indices are accepted as a
    /// no-op.
    fn delete(&mut self, i: I) -> Result<(), StockError>;

    /// The set of currently live (allocated, not freed) indices. Expensive;
    /// intended for verification, not hot paths.
    fn get_ids(&self) -> Result<ComplementSet<I>, StockError>;

    fn flush(&mut self) -> Result<(), StockError>;

    fn close(self) -> Result<(), StockError>;
}
