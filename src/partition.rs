//! PartitionHandle: one loaded snapshot, shared reads, single draining close.
//!
//! Состояния: Open -> Closing -> Closed (только вперёд).
//! - get: быстрый отказ, если не Open; затем try_read на gate. Единственный
//!   писатель gate — close, поэтому WouldBlock означает "идёт закрытие".
//! - close: Open->Closing, затем write() ждёт завершения всех читателей,
//!   забирает store, закрывает его и удаляет файл под тем же exclusive-claim.
//!   Store после этого отсутствует навсегда.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock, TryLockError};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::store::{KvStore, RedbStore};

const STATE_OPEN: u8 = 0;
const STATE_CLOSING: u8 = 1;
const STATE_CLOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closing,
    Closed,
}

impl HandleState {
    fn from_raw(v: u8) -> Self {
        match v {
            STATE_OPEN => HandleState::Open,
            STATE_CLOSING => HandleState::Closing,
            _ => HandleState::Closed,
        }
    }
}

enum Lookup {
    Found(Vec<u8>),
    NoBucket,
    NoKey,
}

pub struct PartitionHandle<S: KvStore = RedbStore> {
    gate: RwLock<Option<S>>,
    state: AtomicU8,
    local_path: PathBuf,
    remote_key: String,
    version: DateTime<Utc>,
}

impl<S: KvStore> PartitionHandle<S> {
    /// Take ownership of an opened store and the file backing it.
    pub fn new(store: S, local_path: PathBuf, remote_key: String, version: DateTime<Utc>) -> Self {
        metrics::record_partition_open();
        Self {
            gate: RwLock::new(Some(store)),
            state: AtomicU8::new(STATE_OPEN),
            local_path,
            remote_key,
            version,
        }
    }

    /// Last-Modified of the remote object this snapshot was loaded from.
    pub fn version_marker(&self) -> DateTime<Utc> {
        self.version
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    pub fn state(&self) -> HandleState {
        HandleState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == HandleState::Open
    }

    /// Point lookup. Never waits for a close in progress.
    pub fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let res = self.get_inner(bucket, key);
        match &res {
            Ok(_) => metrics::record_get_hit(),
            Err(e) if e.is_not_found() => metrics::record_get_not_found(),
            Err(Error::Unavailable) => metrics::record_get_unavailable(),
            Err(_) => metrics::record_get_other(),
        }
        res
    }

    fn get_inner(&self, bucket: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        if !self.is_open() {
            return Err(Error::Unavailable);
        }
        let guard = match self.gate.try_read() {
            Ok(g) => g,
            Err(TryLockError::WouldBlock) => return Err(Error::Unavailable),
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };
        // Под shared-claim: пока store на месте, close не может дойти до удаления файла.
        let store = guard.as_ref().ok_or(Error::Unavailable)?;

        let found = store
            .view(|tx| {
                let Some(b) = tx.bucket(bucket)? else {
                    return Ok(Lookup::NoBucket);
                };
                Ok(match b.get(key)? {
                    Some(v) => Lookup::Found(v),
                    None => Lookup::NoKey,
                })
            })
            .map_err(Error::StoreRead)?;

        match found {
            Lookup::Found(v) => Ok(v),
            Lookup::NoBucket => Err(Error::BucketNotFound {
                bucket: bucket.to_vec(),
            }),
            Lookup::NoKey => Err(Error::KeyNotFound {
                bucket: bucket.to_vec(),
                key: key.to_vec(),
            }),
        }
    }

    /// Drain in-flight reads, close the store, delete the backing file.
    ///
    /// The file is removed even when closing the store fails; the store error
    /// is still returned. A repeated (or concurrent) call waits for the first
    /// one and then only makes sure the file is gone.
    pub fn close(&self) -> Result<()> {
        let first = self
            .state
            .compare_exchange(STATE_OPEN, STATE_CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        let mut guard = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let store = guard.take();
        self.state.store(STATE_CLOSED, Ordering::Release);

        let close_res = match store {
            Some(s) => s.close().map_err(Error::StoreClose),
            None => Ok(()),
        };
        let remove_res = remove_backing_file(&self.local_path);
        drop(guard);

        if first {
            metrics::record_partition_closed();
            info!(
                "partition: closed key={} file={}",
                self.remote_key,
                self.local_path.display()
            );
        }

        match (close_res, remove_res) {
            (Err(e), Err(rm)) => {
                warn!("partition: {} (store close also failed)", rm);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), r) => r,
        }
    }
}

fn remove_backing_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("partition: removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::RemoveFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl<S: KvStore> Drop for PartitionHandle<S> {
    fn drop(&mut self) {
        if self.state() == HandleState::Closed {
            return;
        }
        if let Err(e) = self.close() {
            warn!("partition: close on drop failed key={}: {}", self.remote_key, e);
        }
    }
}

impl<S: KvStore> std::fmt::Debug for PartitionHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionHandle")
            .field("remote_key", &self.remote_key)
            .field("local_path", &self.local_path)
            .field("version", &self.version)
            .field("state", &self.state())
            .finish()
    }
}
