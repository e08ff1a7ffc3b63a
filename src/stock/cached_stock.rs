//! [`CachedStock`]: a write-through LRU over any [`Stock`]. Eviction writes
//! the evicted entry back to the underlying stock; `flush` writes every
//! cached entry back unconditionally since the cache does not track dirty
//! bits (a deliberate trade).

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::config::StockConfig;
use crate::error::StockError;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;
use crate::stock::Stock;

/// Default cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 1_000_000;

pub struct CachedStock<I, V, S> {
    inner: S,
    cache: LruCache<I, V>,
}

impl<I, V, S> CachedStock<I, V, S>
where
    I: FixedWidthInt,
    V: Clone,
    S: Stock<I, V>,
{
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// As [`new`](Self::new), but taking the cache capacity from
    /// `config.cache_capacity` rather than the crate default.
    pub fn with_config(inner: S, config: &StockConfig) -> Self {
        Self::with_capacity(inner, config.cache_capacity)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap());
        CachedStock {
            inner,
            cache: LruCache::new(capacity),
        }
    }

    /// Writes the evicted `(id, value)` pair back to the underlying stock,
    /// if the cache just evicted one.
    fn write_back_eviction(&mut self, evicted: Option<(I, V)>) -> Result<(), StockError> {
        if let Some((id, value)) = evicted {
            log::debug!("cached_stock: writing back evicted entry {:?}", id);
            self.inner.set(id, value)?;
        }
        Ok(())
    }

    /// Inserts `(i, v)` into the cache, writing back whatever entry that
    /// insertion evicts (if `i` is new and the cache was already full).
    /// Deliberately checks `peek_lru` before inserting rather than relying
    /// on `LruCache::push`'s return value, so an in-place update of an
    /// already-cached key is never mistaken for an eviction of stale data.
    fn insert_with_writeback(&mut self, i: I, v: V) -> Result<(), StockError> {
        let about_to_evict = if !self.cache.contains(&i) && self.cache.len() == self.cache.cap().get() {
            self.cache.peek_lru().map(|(k, v)| (*k, v.clone()))
        } else {
            None
        };
        self.cache.put(i, v);
        self.write_back_eviction(about_to_evict)
    }
}

impl<I, V, S> Stock<I, V> for CachedStock<I, V, S>
where
    I: FixedWidthInt,
    V: Clone,
    S: Stock<I, V>,
{
    fn new_id(&mut self) -> Result<I, StockError> {
        let id = self.inner.new_id()?;
        let value = self.inner.get(id)?;
        self.insert_with_writeback(id, value)?;
        Ok(id)
    }

    fn get(&mut self, i: I) -> Result<V, StockError> {
        if let Some(v) = self.cache.get(&i) {
            return Ok(v.clone());
        }
        // Copy into a cache-owned cell: the underlying stock's internal
        // storage may be invalidated by a later operation.
        let value = self.inner.get(i)?;
        self.insert_with_writeback(i, value.clone())?;
        Ok(value)
    }

    fn set(&mut self, i: I, v: V) -> Result<(), StockError> {
        self.insert_with_writeback(i, v)
    }

    fn delete(&mut self, i: I) -> Result<(), StockError> {
        self.inner.delete(i)?;
        self.cache.pop(&i);
        Ok(())
    }

    fn get_ids(&self) -> Result<ComplementSet<I>, StockError> {
        self.inner.get_ids()
    }

    fn flush(&mut self) -> Result<(), StockError> {
        let entries: Vec<(I, V)> = self
            .cache
            .iter()
            .map(|(id, v)| (*id, v.clone()))
            .collect();

        // Gather every write-back failure, but flush the underlying stock
        // regardless of whether any write-back failed -- a failed cache
        // entry must not prevent the rest of the stock from being durably
        // persisted (mirrors FileStock::flush's error-folding pattern).
        let mut errors = Vec::new();
        for (id, v) in entries {
            if let Err(e) = self.inner.set(id, v) {
                errors.push(e);
            }
        }
        if let Err(e) = self.inner.flush() {
            errors.push(e);
        }
        StockError::join(errors.into_iter().map(Err).collect()).map(|_: Vec<()>| ())
    }

    fn close(mut self) -> Result<(), StockError> {
        let mut errors = Vec::new();
        if let Err(e) = self.flush() {
            errors.push(e);
        }
        if let Err(e) = self.inner.close() {
            errors.push(e);
        }
        StockError::join(errors.into_iter().map(Err).collect()).map(|_: Vec<()>| ())
    }
}
