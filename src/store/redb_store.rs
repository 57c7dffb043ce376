//! redb-backed store: buckets are tables of raw bytes.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use redb::{Database, ReadOnlyTable, ReadTransaction, TableDefinition, TableError};

use super::{BucketRef, KvStore, ReadTx};

type RawTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

fn bucket_def(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

pub struct RedbStore {
    db: Database,
}

impl KvStore for RedbStore {
    // redb держит эксклюзивный OS-lock на файле, пока Database жива.
    // На обрезанном образе redb падает на assert вместо ошибки: паника
    // перехватывается и становится обычной ошибкой открытия.
    fn open(path: &Path) -> Result<Self> {
        let opened = panic::catch_unwind(AssertUnwindSafe(|| Database::open(path)));
        let db = match opened {
            Ok(res) => res.with_context(|| format!("redb open {}", path.display()))?,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!("redb open {}: panicked: {}", path.display(), msg);
                return Err(anyhow!("redb open {}: corrupt image ({})", path.display(), msg));
            }
        };
        Ok(Self { db })
    }

    fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTx) -> Result<T>,
    {
        let tx = self.db.begin_read().context("redb begin_read")?;
        f(&RedbTx(tx))
    }

    fn close(self) -> Result<()> {
        // redb flushes nothing for a read-only session; dropping releases the file lock.
        drop(self.db);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct RedbTx(ReadTransaction);

impl ReadTx for RedbTx {
    fn bucket<'a>(&'a self, name: &[u8]) -> Result<Option<Box<dyn BucketRef + 'a>>> {
        let Ok(name) = std::str::from_utf8(name) else {
            return Ok(None);
        };
        match self.0.open_table(bucket_def(name)) {
            Ok(t) => Ok(Some(Box::new(RedbBucket(t)))),
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("open bucket '{}'", name)),
        }
    }
}

struct RedbBucket(RawTable);

impl BucketRef for RedbBucket {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(key)?.map(|v| v.value().to_vec()))
    }
}

/// Build a store image at `path` (created or overwritten in place) from
/// bucket -> key -> value.
pub fn write_index(path: &Path, buckets: &BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>) -> Result<()> {
    let db = Database::create(path).with_context(|| format!("redb create {}", path.display()))?;
    let wtx = db.begin_write()?;
    let mut pairs = 0usize;
    for (bucket, entries) in buckets {
        let mut table = wtx
            .open_table(bucket_def(bucket))
            .with_context(|| format!("create bucket '{}'", bucket))?;
        for (k, v) in entries {
            table.insert(k.as_slice(), v.as_slice())?;
            pairs += 1;
        }
    }
    wtx.commit()?;
    debug!(
        "write_index: {} bucket(s), {} pair(s) -> {}",
        buckets.len(),
        pairs,
        path.display()
    );
    Ok(())
}
