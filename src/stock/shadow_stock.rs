//! [`ShadowStock`]: runs two inner stocks in lockstep and asserts
//! equivalence of results, for differential testing against the
//! [`crate::stock::memory_stock::MemoryStock`] oracle.

use std::fmt::Debug;

use crate::error::StockError;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;
use crate::stock::Stock;

pub struct ShadowStock<I, V, A, B> {
    primary: A,
    secondary: B,
    _marker: std::marker::PhantomData<(I, V)>,
}

impl<I, V, A, B> ShadowStock<I, V, A, B>
where
    I: FixedWidthInt,
    V: PartialEq + Debug,
    A: Stock<I, V>,
    B: Stock<I, V>,
{
    pub fn new(primary: A, secondary: B) -> Self {
        ShadowStock {
            primary,
            secondary,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<I, V, A, B> Stock<I, V> for ShadowStock<I, V, A, B>
where
    I: FixedWidthInt,
    V: PartialEq + Debug + Clone,
    A: Stock<I, V>,
    B: Stock<I, V>,
{
    fn new_id(&mut self) -> Result<I, StockError> {
        let a = self.primary.new_id()?;
        let b = self.secondary.new_id()?;
        if a != b {
            panic!("ShadowStock: new() disagreement: primary={:?} secondary={:?}", a, b);
        }
        Ok(a)
    }

    fn get(&mut self, i: I) -> Result<V, StockError> {
        let a = self.primary.get(i)?;
        let b = self.secondary.get(i)?;
        if a != b {
            panic!("ShadowStock: get({:?}) disagreement: primary={:?} secondary={:?}", i, a, b);
        }
        Ok(a)
    }

    fn set(&mut self, i: I, v: V) -> Result<(), StockError> {
        let results = vec![self.primary.set(i, v.clone()), self.secondary.set(i, v)];
        StockError::join(results).map(|_: Vec<()>| ())
    }

    fn delete(&mut self, i: I) -> Result<(), StockError> {
        self.primary.delete(i)?;
        self.secondary.delete(i)?;
        Ok(())
    }

    fn get_ids(&self) -> Result<ComplementSet<I>, StockError> {
        let a = self.primary.get_ids()?;
        let b = self.secondary.get_ids()?;
        for idx in a.lower_bound().to_u64()..a.upper_bound().to_u64() {
            let idx = I::from_u64(idx);
            if a.contains(idx) != b.contains(idx) {
                panic!(
                    "ShadowStock: get_ids() disagreement at {:?}: primary={} secondary={}",
                    idx,
                    a.contains(idx),
                    b.contains(idx)
                );
            }
        }
        Ok(a)
    }

    fn flush(&mut self) -> Result<(), StockError> {
        let results = vec![self.primary.flush(), self.secondary.flush()];
        StockError::join(results).map(|_: Vec<()>| ())
    }

    fn close(self) -> Result<(), StockError> {
        let results = vec![self.primary.close(), self.secondary.close()];
        StockError::join(results).map(|_: Vec<()>| ())
    }
}
