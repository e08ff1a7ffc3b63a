//! Tunable parameters for the stock layer. Loadable from a small TOML or
//! JSON file, or built programmatically — simplified relative to a
//! daemon-wide config file since this crate only has a handful of
//! constants that govern cache size, free-list buffering and page size.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffered_file::PAGE_SIZE;
use crate::error::StockError;
use crate::free_list::DEFAULT_BUFFER_CAPACITY;
use crate::stock::DEFAULT_CACHE_CAPACITY;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StockConfig {
    /// `C`: CachedStock's LRU capacity.
    pub cache_capacity: usize,
    /// `B`: FreeListStack's in-memory tail buffer capacity.
    pub free_list_buffer_capacity: usize,
    /// `P`: BufferedFile's page size in bytes.
    pub page_size: u64,
}

impl Default for StockConfig {
    fn default() -> Self {
        StockConfig {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            free_list_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            page_size: PAGE_SIZE,
        }
    }
}

impl StockConfig {
    /// Loads a config from `path`, dispatching on its extension: `.json`
    /// parses as JSON, anything else as TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StockError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&data)
                .map_err(|e| StockError::other(format!("invalid config {:?}: {}", path, e)))
        } else {
            toml::from_str(&data)
                .map_err(|e| StockError::other(format!("invalid config {:?}: {}", path, e)))
        }
    }
}
