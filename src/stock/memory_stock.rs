//! [`MemoryStock`]: an in-memory stock with the same observable contract as
//! [`crate::stock::file_stock::FileStock`]. Serves as the oracle for
//! differential testing via [`crate::stock::shadow_stock::ShadowStock`].

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::StockError;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;
use crate::stock::Stock;
use crate::value::ValueEncoder;

pub struct MemoryStock<I, V, E> {
    dir: Option<PathBuf>,
    values: Vec<V>,
    free_list: Vec<I>,
    _marker: PhantomData<E>,
}

impl<I, V, E> MemoryStock<I, V, E>
where
    I: FixedWidthInt,
    V: Clone,
    E: ValueEncoder<V>,
{
    /// A pure in-memory stock with no persistence.
    pub fn new() -> Self {
        MemoryStock {
            dir: None,
            values: Vec::new(),
            free_list: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Loads from (or creates) `values.dat`/`freelist.dat` in `dir`, doing a
    /// full rewrite on every `flush` rather than FileStock's incremental
    /// updates.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StockError> {
        let dir = dir.as_ref().to_owned();
        crate::fs::create_dir_secure(&dir)?;

        let values_path = dir.join("values.dat");
        let free_list_path = dir.join("freelist.dat");

        let mut values = Vec::new();
        if values_path.exists() {
            let data = fs::read(&values_path)?;
            for chunk in data.chunks_exact(E::ENCODED_SIZE) {
                values.push(E::load(chunk)?);
            }
        }

        let mut free_list = Vec::new();
        if free_list_path.exists() {
            let data = fs::read(&free_list_path)?;
            if data.len() % I::WIDTH != 0 {
                return Err(StockError::InvalidFreeListSize);
            }
            for chunk in data.chunks_exact(I::WIDTH) {
                free_list.push(I::from_be_bytes_slice(chunk));
            }
        }

        Ok(MemoryStock {
            dir: Some(dir),
            values,
            free_list,
            _marker: PhantomData,
        })
    }
}

impl<I, V, E> Stock<I, V> for MemoryStock<I, V, E>
where
    I: FixedWidthInt,
    V: Clone,
    E: ValueEncoder<V>,
{
    fn new_id(&mut self) -> Result<I, StockError> {
        if let Some(id) = self.free_list.pop() {
            return Ok(id);
        }
        let id = I::from_u64(self.values.len() as u64);
        self.values.push(E::zero());
        Ok(id)
    }

    fn get(&mut self, i: I) -> Result<V, StockError> {
        let idx = i.to_u64() as usize;
        Ok(self
            .values
            .get(idx)
            .cloned()
            .unwrap_or_else(E::zero))
    }

    fn set(&mut self, i: I, v: V) -> Result<(), StockError> {
        let idx = i.to_u64() as usize;
        if idx >= self.values.len() {
            return Err(StockError::IndexOutOfRange {
                got: idx as u64,
                bound: self.values.len() as u64,
            });
        }
        self.values[idx] = v;
        Ok(())
    }

    fn delete(&mut self, i: I) -> Result<(), StockError> {
        self.free_list.push(i);
        Ok(())
    }

    fn get_ids(&self) -> Result<ComplementSet<I>, StockError> {
        let lo = I::from_u64(0);
        let hi = I::from_u64(self.values.len() as u64);
        Ok(ComplementSet::with_excluded(lo, hi, self.free_list.iter().copied()))
    }

    fn flush(&mut self) -> Result<(), StockError> {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(()),
        };

        let mut values_buf = vec![0u8; self.values.len() * E::ENCODED_SIZE];
        for (idx, v) in self.values.iter().enumerate() {
            E::store(
                &mut values_buf[idx * E::ENCODED_SIZE..(idx + 1) * E::ENCODED_SIZE],
                v,
            )?;
        }

        let mut free_list_buf = Vec::with_capacity(self.free_list.len() * I::WIDTH);
        for id in &self.free_list {
            free_list_buf.extend_from_slice(&id.to_be_bytes_vec());
        }

        let mut errors = Vec::new();
        if let Err(e) = crate::fs::atomic_write(
            dir.join("values.dat"),
            &values_buf,
            crate::fs::data_file_mode(),
        ) {
            errors.push(e);
        }
        if let Err(e) = crate::fs::atomic_write(
            dir.join("freelist.dat"),
            &free_list_buf,
            crate::fs::data_file_mode(),
        ) {
            errors.push(e);
        }
        StockError::join(errors.into_iter().map(Err).collect()).map(|_: Vec<()>| ())
    }

    fn close(mut self) -> Result<(), StockError> {
        self.flush()
    }
}

impl<I, V, E> Default for MemoryStock<I, V, E>
where
    I: FixedWidthInt,
    V: Clone,
    E: ValueEncoder<V>,
{
    fn default() -> Self {
        Self::new()
    }
}
