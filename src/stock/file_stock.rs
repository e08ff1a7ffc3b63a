//! [`FileStock`]: the durable slot pool. Combines a [`BufferedFile`] for
//! values, a [`FreeListStack`] for reusable indices, and a `meta.json`
//! sidecar.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffered_file::BufferedFile;
use crate::config::StockConfig;
use crate::error::StockError;
use crate::free_list::FreeListStack;
use crate::index::FixedWidthInt;
use crate::index_set::ComplementSet;
use crate::stock::Stock;
use crate::value::ValueEncoder;

/// Format version this build recognizes. Bump when the on-disk layout
/// changes in a way old builds cannot read.
const FORMAT_VERSION: u32 = 1;

const META_FILENAME: &str = "meta.json";
const VALUES_FILENAME: &str = "values.dat";
const FREELIST_FILENAME: &str = "freelist.dat";

/// `meta.json`'s exact on-disk shape: PascalCase field names, no floats.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct Meta {
    #[serde(rename = "Version")]
    version: u32,
    #[serde(rename = "IndexTypeSize")]
    index_type_size: usize,
    #[serde(rename = "ValueTypeSize")]
    value_type_size: usize,
    #[serde(rename = "ValueListLength")]
    value_list_length: u64,
    #[serde(rename = "FreeListLength")]
    free_list_length: u64,
    #[serde(rename = "NumValuesInFile")]
    num_values_in_file: u64,
}

pub struct FileStock<I, V, E> {
    dir: PathBuf,
    values: BufferedFile,
    free_list: FreeListStack<I>,
    /// High-water mark of allocated identifiers.
    num_value_slots: u64,
    /// High-water mark of bytes actually written into `values.dat`.
    num_values_in_file: u64,
    _marker: PhantomData<(V, E)>,
}

impl<I, V, E> FileStock<I, V, E>
where
    I: FixedWidthInt,
    E: ValueEncoder<V>,
{
    /// Creates `dir` if absent, or validates and loads an existing store,
    /// using the default [`StockConfig`] (4 KiB pages, a 1000-entry
    /// free-list buffer).
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StockError> {
        Self::open_with_config(dir, &StockConfig::default())
    }

    /// As [`open`](Self::open), but threading `config.page_size` through to
    /// the values [`BufferedFile`] and `config.free_list_buffer_capacity`
    /// through to the [`FreeListStack`].
    pub fn open_with_config<P: AsRef<Path>>(dir: P, config: &StockConfig) -> Result<Self, StockError> {
        let dir = dir.as_ref().to_owned();
        crate::fs::create_dir_secure(&dir)?;

        let meta_path = dir.join(META_FILENAME);
        let values = BufferedFile::open_with_page_size(dir.join(VALUES_FILENAME), config.page_size)?;
        let free_list: FreeListStack<I> = FreeListStack::open_with_capacity(
            dir.join(FREELIST_FILENAME),
            config.free_list_buffer_capacity,
        )?;

        let (num_value_slots, num_values_in_file) = if meta_path.exists() {
            let meta = read_meta(&meta_path)?;
            validate_meta::<I, V, E>(&meta, &values, &free_list)?;
            (meta.value_list_length, meta.num_values_in_file)
        } else {
            // Missing meta.json is a fresh, empty stock,
            // regardless of whatever values.dat/freelist.dat happen to
            // contain -- without a meta.json there is no trustworthy
            // record of what range of indices those bytes represent.
            (0, 0)
        };

        Ok(FileStock {
            dir,
            values,
            free_list,
            num_value_slots,
            num_values_in_file,
            _marker: PhantomData,
        })
    }

    /// Opens without mutating and re-runs every structural check, including
    /// a byte-exact reload of the free list. Returns the first inconsistency
    /// found, if any. Intended for verification tooling, not hot paths.
    pub fn verify<P: AsRef<Path>>(dir: P) -> Result<(), StockError> {
        Self::open(dir).map(|_| ())
    }

    fn meta(&self) -> Meta {
        Meta {
            version: FORMAT_VERSION,
            index_type_size: I::WIDTH,
            value_type_size: E::ENCODED_SIZE,
            value_list_length: self.num_value_slots,
            free_list_length: self.free_list.len(),
            num_values_in_file: self.num_values_in_file,
        }
    }
}

fn read_meta(path: &Path) -> Result<Meta, StockError> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|_| StockError::InvalidVersion)
}

fn validate_meta<I: FixedWidthInt, V, E: ValueEncoder<V>>(
    meta: &Meta,
    values: &BufferedFile,
    free_list: &FreeListStack<I>,
) -> Result<(), StockError> {
    if meta.version != FORMAT_VERSION {
        return Err(StockError::InvalidVersion);
    }
    if meta.index_type_size != I::WIDTH {
        return Err(StockError::InvalidIndexEncoding);
    }
    if meta.value_type_size != E::ENCODED_SIZE {
        return Err(StockError::InvalidValueEncoding);
    }
    let free_list_bytes = free_list.len() * I::WIDTH as u64;
    let expected_free_list_bytes = meta.free_list_length * I::WIDTH as u64;
    if free_list_bytes != expected_free_list_bytes {
        return Err(StockError::InvalidFreeListSize);
    }
    let values_len = values.len()?;
    let required = meta.num_values_in_file * meta.value_type_size as u64;
    if values_len < required {
        return Err(StockError::InsufficientValueFileSize);
    }
    Ok(())
}

impl<I, V, E> Stock<I, V> for FileStock<I, V, E>
where
    I: FixedWidthInt,
    E: ValueEncoder<V>,
{
    fn new_id(&mut self) -> Result<I, StockError> {
        if !self.free_list.is_empty() {
            return self.free_list.pop();
        }
        let id = I::from_u64(self.num_value_slots);
        self.num_value_slots += 1;
        Ok(id)
    }

    fn get(&mut self, i: I) -> Result<V, StockError> {
        let idx = i.to_u64();
        if idx >= self.num_value_slots || idx >= self.num_values_in_file {
            return Ok(E::zero());
        }
        let size = E::ENCODED_SIZE as u64;
        let mut buf = vec![0u8; E::ENCODED_SIZE];
        self.values.read(idx * size, &mut buf)?;
        E::load(&buf)
    }

    fn set(&mut self, i: I, v: V) -> Result<(), StockError> {
        let idx = i.to_u64();
        if idx >= self.num_value_slots {
            return Err(StockError::IndexOutOfRange {
                got: idx,
                bound: self.num_value_slots,
            });
        }
        let size = E::ENCODED_SIZE as u64;
        let mut buf = vec![0u8; E::ENCODED_SIZE];
        E::store(&mut buf, &v)?;

        // Zero-write elision: a lazily-zero slot reads as zero already, so
        // skip persisting a zero write that would only grow the file.
        if idx >= self.num_values_in_file && buf.iter().all(|&b| b == 0) {
            return Ok(());
        }

        self.values.write(idx * size, &buf)?;
        if idx >= self.num_values_in_file {
            self.num_values_in_file = idx + 1;
        }
        Ok(())
    }

    fn delete(&mut self, i: I) -> Result<(), StockError> {
        // Accepted unconditionally, including out-of-range indices: clients
        // own lifecycle management and duplicate deletes are undefined
        // behavior, but must not crash.
        self.free_list.push(i)
    }

    fn get_ids(&self) -> Result<ComplementSet<I>, StockError> {
        // This re-reads the free list's on-disk tail without disturbing the
        // live stack, which is acceptable because get_ids is documented as
        // an expensive, verification-only operation.
        let lo = I::from_u64(0);
        let hi = I::from_u64(self.num_value_slots);
        let excluded = self.free_list_snapshot()?;
        Ok(ComplementSet::with_excluded(lo, hi, excluded))
    }

    fn flush(&mut self) -> Result<(), StockError> {
        let meta = self.meta();
        let data = serde_json::to_vec_pretty(&meta)
            .map_err(|e| StockError::other(format!("failed to serialize meta.json: {}", e)))?;

        let mut errors = Vec::new();
        if let Err(e) = crate::fs::atomic_write(
            self.dir.join(META_FILENAME),
            &data,
            crate::fs::data_file_mode(),
        ) {
            errors.push(e);
        }
        if let Err(e) = self.values.flush() {
            errors.push(e);
        }
        if let Err(e) = self.free_list.flush() {
            errors.push(e);
        }
        StockError::join(errors.into_iter().map(Err).collect()).map(|_: Vec<()>| ())
    }

    fn close(mut self) -> Result<(), StockError> {
        self.flush()
    }
}

impl<I: FixedWidthInt, V, E: ValueEncoder<V>> FileStock<I, V, E> {
    /// Reads the free list's current contents without mutating the stack
    /// (used by `get_ids`, which must not disturb the LIFO structure).
    fn free_list_snapshot(&self) -> Result<Vec<I>, StockError> {
        let width = I::WIDTH as u64;
        let disk_entries = self.free_list.disk_len();
        let mut entries = Vec::with_capacity(self.free_list.len() as usize);
        if disk_entries > 0 {
            let disk_bytes = (disk_entries * width) as usize;
            let data = fs::read(self.free_list.path())?;
            entries.extend(
                data[..disk_bytes.min(data.len())]
                    .chunks_exact(width as usize)
                    .map(I::from_be_bytes_slice),
            );
        }
        entries.extend_from_slice(self.free_list.in_memory_tail());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FixedBytes;
    use tempfile::tempdir;

    type U64Stock = FileStock<u32, [u8; 8], FixedBytes<8>>;

    fn v(n: u64) -> [u8; 8] {
        n.to_be_bytes()
    }

    #[test]
    fn basic_cycle() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        let i1 = s.new_id().unwrap();
        s.set(i1, v(1)).unwrap();
        let i2 = s.new_id().unwrap();
        s.set(i2, v(2)).unwrap();
        assert_ne!(i1, i2);
        assert_eq!(s.get(i1).unwrap(), v(1));
        assert_eq!(s.get(i2).unwrap(), v(2));
        s.close().unwrap();

        let mut reopened: U64Stock = FileStock::open(dir.path()).unwrap();
        assert_eq!(reopened.get(i1).unwrap(), v(1));
        assert_eq!(reopened.get(i2).unwrap(), v(2));
    }

    #[test]
    fn open_with_config_threads_page_size_through() {
        let dir = tempdir().unwrap();
        let config = StockConfig {
            page_size: 64,
            ..StockConfig::default()
        };
        let i1 = {
            let mut s: U64Stock = FileStock::open_with_config(dir.path(), &config).unwrap();
            let i1 = s.new_id().unwrap();
            s.set(i1, v(1)).unwrap();
            s.close().unwrap();
            i1
        };
        let len = fs::metadata(dir.path().join(VALUES_FILENAME)).unwrap().len();
        assert_eq!(len % config.page_size, 0);

        // Reopening with the same non-default page size must still read back
        // correctly -- meta.json carries no page size, so this is purely a
        // property of values.dat's layout being a multiple of it.
        let mut reopened: U64Stock = FileStock::open_with_config(dir.path(), &config).unwrap();
        assert_eq!(reopened.get(i1).unwrap(), v(1));
    }

    #[test]
    fn free_list_reuse() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        let mut seen = std::collections::HashSet::new();
        let mut reused = false;
        for _ in 0..2000 {
            let id = s.new_id().unwrap();
            if !seen.insert(id) {
                reused = true;
            }
            s.delete(id).unwrap();
        }
        assert!(reused);
    }

    #[test]
    fn lazy_zero_without_io() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        let mut ids = Vec::new();
        for _ in 0..1000 {
            ids.push(s.new_id().unwrap());
        }
        for id in ids {
            assert_eq!(s.get(id).unwrap(), [0u8; 8]);
        }
        assert_eq!(s.num_values_in_file, 0);
    }

    #[test]
    fn set_out_of_range_fails() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        match s.set(5, v(1)) {
            Err(StockError::IndexOutOfRange { got: 5, bound: 0 }) => {}
            other => panic!("expected IndexOutOfRange, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn delete_out_of_range_is_noop_not_crash() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        s.delete(42).unwrap();
    }

    #[test]
    fn zero_write_elision_does_not_grow_file() {
        let dir = tempdir().unwrap();
        let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
        let id = s.new_id().unwrap();
        s.set(id, [0u8; 8]).unwrap();
        assert_eq!(s.num_values_in_file, 0);
    }

    #[test]
    fn corrupted_version_is_detected() {
        let dir = tempdir().unwrap();
        {
            let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
            let id = s.new_id().unwrap();
            s.set(id, v(7)).unwrap();
            s.close().unwrap();
        }
        let meta_path = dir.path().join(META_FILENAME);
        let mut meta: serde_json::Value =
            serde_json::from_slice(&fs::read(&meta_path).unwrap()).unwrap();
        meta["Version"] = serde_json::json!(999);
        fs::write(&meta_path, serde_json::to_vec(&meta).unwrap()).unwrap();

        match U64Stock::open(dir.path()) {
            Err(StockError::InvalidVersion) => {}
            other => panic!("expected InvalidVersion, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn corrupted_index_width_is_detected() {
        let dir = tempdir().unwrap();
        {
            let mut s: U64Stock = FileStock::open(dir.path()).unwrap();
            let id = s.new_id().unwrap();
            s.set(id, v(7)).unwrap();
            s.close().unwrap();
        }
        let meta_path = dir.path().join(META_FILENAME);
        let mut meta: serde_json::Value =
            serde_json::from_slice(&fs::read(&meta_path).unwrap()).unwrap();
        meta["IndexTypeSize"] = serde_json::json!(8);
        fs::write(&meta_path, serde_json::to_vec(&meta).unwrap()).unwrap();

        match U64Stock::open(dir.path()) {
            Err(StockError::InvalidIndexEncoding) => {}
            other => panic!("expected InvalidIndexEncoding, got {:?}", other.map(|_| ())),
        }
    }
}
