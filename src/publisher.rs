//! SnapshotPublisher: local index file -> gzip in memory -> single PUT.
//!
//! Весь сжатый объект держится в памяти: память ~ размер сжатого индекса.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::remote::{ObjectStore, PutOptions};

pub struct SnapshotPublisher {
    remote: Arc<dyn ObjectStore>,
    cfg: CacheConfig,
}

impl SnapshotPublisher {
    pub fn new(remote: Arc<dyn ObjectStore>, cfg: CacheConfig) -> Self {
        Self { remote, cfg }
    }

    /// Compress `local_path` and upload it under `remote_key`, replacing any
    /// existing object. Returns the number of compressed bytes uploaded.
    pub fn publish(&self, local_path: &Path, remote_key: &str) -> Result<u64> {
        let res = self.publish_inner(local_path, remote_key);
        match &res {
            Ok(n) => metrics::record_publish(*n),
            Err(e) => {
                metrics::record_publish_failed();
                warn!("publish: {} -> {} failed: {}", local_path.display(), remote_key, e);
            }
        }
        res
    }

    fn publish_inner(&self, local_path: &Path, remote_key: &str) -> Result<u64> {
        let read_err = |source: io::Error| Error::LocalRead {
            path: local_path.to_path_buf(),
            source,
        };

        let mut f = File::open(local_path).map_err(read_err)?;
        let size_hint = f.metadata().map(|m| m.len() as usize / 2).unwrap_or(0);

        let mut enc = GzEncoder::new(
            Vec::with_capacity(size_hint),
            Compression::new(self.cfg.gzip_level),
        );
        // Запись в Vec не падает: ошибка io::copy — это ошибка чтения файла.
        let raw = io::copy(&mut f, &mut enc).map_err(read_err)?;
        let body = enc.finish().map_err(Error::Compress)?;
        let compressed = body.len() as u64;

        let opts = PutOptions::gzip(self.cfg.content_type.clone());
        self.remote
            .store(remote_key, body, &opts)
            .map_err(|source| Error::Upload {
                key: remote_key.to_string(),
                source,
            })?;

        info!(
            "publish: {} -> {} raw={} gz={}",
            local_path.display(),
            remote_key,
            raw,
            compressed
        );
        Ok(compressed)
    }
}
