//! SnapshotLoader: remote gzip object -> local snapshot file -> open store.
//!
//! Шаги (всё или ничего):
//! 1) fetch + Last-Modified (отсутствие/мусор -> Fetch);
//! 2) gzip-декодер (multi-member); заголовок проверяется до создания файла;
//! 3) поток в уникальный temp-файл (temp_dir/temp_prefix*);
//! 4) open store; при ошибке temp-файл удаляется до возврата ошибки;
//! 5) PartitionHandle с version_marker из шага 1.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use log::{debug, info, warn};
use tempfile::{NamedTempFile, TempPath};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::partition::PartitionHandle;
use crate::remote::ObjectStore;
use crate::store::{KvStore, RedbStore};
use crate::version::parse_version_marker;

const COPY_BUF: usize = 64 * 1024;

pub struct SnapshotLoader {
    remote: Arc<dyn ObjectStore>,
    cfg: CacheConfig,
}

impl SnapshotLoader {
    pub fn new(remote: Arc<dyn ObjectStore>, cfg: CacheConfig) -> Self {
        Self { remote, cfg }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    /// Load `remote_key` into a redb-backed partition.
    pub fn load(&self, remote_key: &str) -> Result<PartitionHandle<RedbStore>> {
        self.load_with::<RedbStore>(remote_key)
    }

    pub fn load_with<S: KvStore>(&self, remote_key: &str) -> Result<PartitionHandle<S>> {
        let res = self.load_inner::<S>(remote_key);
        if let Err(e) = &res {
            metrics::record_load_failed();
            warn!("load: key={} failed: {}", remote_key, e);
        }
        res
    }

    fn load_inner<S: KvStore>(&self, remote_key: &str) -> Result<PartitionHandle<S>> {
        let fetch_err = |source: anyhow::Error| Error::Fetch {
            key: remote_key.to_string(),
            source,
        };

        // 1) fetch
        let obj = self.remote.fetch(remote_key).map_err(fetch_err)?;
        let raw_lm = obj
            .meta
            .last_modified
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| fetch_err(anyhow::anyhow!("missing last-modified")))?;
        let version = parse_version_marker(raw_lm).map_err(fetch_err)?;
        debug!(
            "load: key={} last_modified={} size={}",
            remote_key, raw_lm, obj.meta.size
        );

        // 2) gzip, все member-ы подряд; мусор после последнего -> Decompress.
        //    Первое заполнение буфера читает заголовок: битый gzip
        //    отсекается до того, как на диске что-то появится.
        let mut reader = BufReader::with_capacity(COPY_BUF, MultiGzDecoder::new(obj.body));
        reader.fill_buf().map_err(Error::Decompress)?;

        // 3) temp file
        fs::create_dir_all(&self.cfg.temp_dir).map_err(|source| Error::LocalWrite {
            path: self.cfg.temp_dir.clone(),
            source,
        })?;
        let mut tmp = tempfile::Builder::new()
            .prefix(&self.cfg.temp_prefix)
            .suffix(".db")
            .tempfile_in(&self.cfg.temp_dir)
            .map_err(|source| Error::LocalWrite {
                path: self.cfg.temp_dir.clone(),
                source,
            })?;

        let written = match copy_decompressed(&mut reader, &mut tmp) {
            Ok(n) => n,
            Err(e) => {
                discard_file(tmp);
                return Err(e);
            }
        };
        let temp_path = tmp.into_temp_path();

        // 4) open store
        let store = match S::open(&temp_path) {
            Ok(s) => s,
            Err(source) => {
                let path = temp_path.to_path_buf();
                discard_path(temp_path);
                return Err(Error::StoreOpen { path, source });
            }
        };

        // 5) файл переходит во владение handle
        let local_path = match temp_path.keep() {
            Ok(p) => p,
            Err(e) => {
                if let Err(ce) = store.close() {
                    warn!("load: close store after keep failure: {:#}", ce);
                }
                let path = e.path.to_path_buf();
                discard_path(e.path);
                return Err(Error::LocalWrite {
                    path,
                    source: e.error,
                });
            }
        };

        metrics::record_load(written);
        info!(
            "load: key={} version={} bytes={} file={}",
            remote_key,
            version,
            written,
            local_path.display()
        );
        Ok(PartitionHandle::new(store, local_path, remote_key.to_string(), version))
    }
}

/// Stream decoder output into the temp file. Read errors are decompression
/// failures, write errors local ones.
fn copy_decompressed<R: BufRead>(reader: &mut R, tmp: &mut NamedTempFile) -> Result<u64> {
    let path = tmp.path().to_path_buf();
    let wr_err = |source: std::io::Error| Error::LocalWrite {
        path: path.clone(),
        source,
    };
    let mut total = 0u64;
    loop {
        let chunk = reader.fill_buf().map_err(Error::Decompress)?;
        if chunk.is_empty() {
            break;
        }
        tmp.write_all(chunk).map_err(wr_err)?;
        let n = chunk.len();
        reader.consume(n);
        total += n as u64;
    }
    tmp.flush().map_err(wr_err)?;
    tmp.as_file().sync_all().map_err(wr_err)?;
    Ok(total)
}

fn discard_file(tmp: NamedTempFile) {
    let path = tmp.path().to_path_buf();
    if let Err(e) = tmp.close() {
        warn!("load: remove temp {}: {}", path.display(), e);
    }
}

fn discard_path(p: TempPath) {
    let path = p.to_path_buf();
    if let Err(e) = p.close() {
        warn!("load: remove temp {}: {}", path.display(), e);
    }
}
