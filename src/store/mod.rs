pub mod sqlite;

use crate::app::Result;
use crate::domain::CacheKey;

pub use sqlite::SqliteStore;

/// Default upper bound on the bytes kept by a store: 1 MiB.
pub const DEFAULT_CAPACITY_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: u64,
    pub bytes: u64,
    pub capacity_bytes: u64,
}

/// Persistent key to resolved-URL mapping with a bounded total size.
pub trait Store {
    fn get(&self, key: &CacheKey) -> Result<Option<String>>;
    fn put(&self, key: &CacheKey, value: &str) -> Result<()>;
    fn stats(&self) -> Result<StoreStats>;
}
