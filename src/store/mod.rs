//! Local key-value store seam.
//!
//! Ядро видит хранилище только через open / view / close и
//! bucket(name).get(key). Формат файла непрозрачен.

use std::path::Path;

use anyhow::Result;

pub mod redb_store;

pub use self::redb_store::{write_index, RedbStore};

/// Read-only transaction: resolves buckets by name.
pub trait ReadTx {
    /// `None` if the bucket does not exist.
    fn bucket<'a>(&'a self, name: &[u8]) -> Result<Option<Box<dyn BucketRef + 'a>>>;
}

pub trait BucketRef {
    /// `None` if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

pub trait KvStore: Send + Sync + Sized {
    /// Open an existing store image, denying other openers of the same file.
    fn open(path: &Path) -> Result<Self>;

    /// Run `f` inside one read transaction.
    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTx) -> Result<T>;

    fn close(self) -> Result<()>;
}
