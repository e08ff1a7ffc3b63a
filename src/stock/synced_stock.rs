//! [`SyncedStock`]: a single mutex serializing every method call on an
//! inner [`Stock`], making it safe under concurrent callers.
//! `BufferedFile` and friends are not thread-safe on their own; this wrapper
//! is what makes that safe.

use std::sync::Mutex;

use crate::error::StockError;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;
use crate::stock::Stock;

pub struct SyncedStock<I, V, S> {
    inner: Mutex<S>,
    _marker: std::marker::PhantomData<(I, V)>,
}

impl<I, V, S> SyncedStock<I, V, S>
where
    I: FixedWidthInt,
    S: Stock<I, V>,
{
    pub fn new(inner: S) -> Self {
        SyncedStock {
            inner: Mutex::new(inner),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<I, V, S> SyncedStock<I, V, SyncedStock<I, V, S>>
where
    I: FixedWidthInt,
    S: Stock<I, V>,
{
    /// Collapses a redundant double-wrap into a single layer, so
    /// `SyncedStock::new(SyncedStock::new(s))` behaves exactly like
    /// `SyncedStock::new(s)` (`sync(sync(S)) == sync(S)`).
    /// Rust's coherence rules don't let `new` auto-detect an
    /// already-synced argument the way a dynamically-typed host language
    /// could, so callers that might double-wrap call this explicitly.
    pub fn flatten(self) -> SyncedStock<I, V, S> {
        self.inner.into_inner().unwrap()
    }
}

impl<I, V, S> Stock<I, V> for SyncedStock<I, V, S>
where
    I: FixedWidthInt,
    S: Stock<I, V>,
{
    fn new_id(&mut self) -> Result<I, StockError> {
        self.inner.get_mut().unwrap().new_id()
    }

    fn get(&mut self, i: I) -> Result<V, StockError> {
        self.inner.get_mut().unwrap().get(i)
    }

    fn set(&mut self, i: I, v: V) -> Result<(), StockError> {
        self.inner.get_mut().unwrap().set(i, v)
    }

    fn delete(&mut self, i: I) -> Result<(), StockError> {
        self.inner.get_mut().unwrap().delete(i)
    }

    fn get_ids(&self) -> Result<ComplementSet<I>, StockError> {
        self.inner.lock().unwrap().get_ids()
    }

    fn flush(&mut self) -> Result<(), StockError> {
        self.inner.get_mut().unwrap().flush()
    }

    fn close(self) -> Result<(), StockError> {
        self.inner.into_inner().unwrap().close()
    }
}

/// A call surface usable from multiple threads: every method takes `&self`
/// and locks the inner mutex for the duration of the call, so operations
/// linearize in acquisition order.
impl<I, V, S> SyncedStock<I, V, S>
where
    I: FixedWidthInt,
    S: Stock<I, V>,
{
    pub fn new_id_locked(&self) -> Result<I, StockError> {
        self.inner.lock().unwrap().new_id()
    }

    pub fn get_locked(&self, i: I) -> Result<V, StockError> {
        self.inner.lock().unwrap().get(i)
    }

    pub fn set_locked(&self, i: I, v: V) -> Result<(), StockError> {
        self.inner.lock().unwrap().set(i, v)
    }

    pub fn delete_locked(&self, i: I) -> Result<(), StockError> {
        self.inner.lock().unwrap().delete(i)
    }

    pub fn flush_locked(&self) -> Result<(), StockError> {
        self.inner.lock().unwrap().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::memory_stock::MemoryStock;
    use crate::value::FixedBytes;
    use std::sync::Arc;
    use std::thread;

    type Inner = MemoryStock<u32, [u8; 8], FixedBytes<8>>;

    #[test]
    fn locked_calls_linearize_across_threads() {
        let synced = Arc::new(SyncedStock::new(Inner::new()));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let synced = Arc::clone(&synced);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let id = synced.new_id_locked().unwrap();
                    synced.set_locked(id, 7u64.to_be_bytes()).unwrap();
                    assert_eq!(synced.get_locked(id).unwrap(), 7u64.to_be_bytes());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn double_wrap_flattens_to_single_layer() {
        let once = SyncedStock::new(Inner::new());
        let twice = SyncedStock::new(once);
        let flattened = twice.flatten();
        let id = flattened.new_id_locked().unwrap();
        flattened.set_locked(id, 3u64.to_be_bytes()).unwrap();
        assert_eq!(flattened.get_locked(id).unwrap(), 3u64.to_be_bytes());
    }
}
