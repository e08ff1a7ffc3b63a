//! Commonly-imported traits and types, bundled in one `mod x; pub use
//! x::*;`-style re-export for callers that just want the whole public
//! surface in scope.

pub use crate::checkpoint::{CheckpointCoordinator, Participant, Restorer};
pub use crate::config::StockConfig;
pub use crate::error::{StockError, StockResult};
pub use crate::index::{FixedWidthInt, IndexCodec};
pub use crate::index_set::ComplementSet;
pub use crate::shared_handle::SharedObject;
pub use crate::stock::{CachedStock, FileStock, MemoryStock, ShadowStock, Stock, SyncedStock};
pub use crate::value::{FixedBytes, ValueEncoder};
