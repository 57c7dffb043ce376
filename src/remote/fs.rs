//! Directory-backed object store.
//!
//! Раскладка:
//! - <root>/<key>            — тело объекта (как загружено, gzip)
//! - <root>/<key>.meta.json  — ObjectMeta (serde_json)
//! - <root>/LOCK             — fs2 lock: writer exclusive, reader shared
//!
//! Замена объекта: запись в <key>.tmp, fsync, rename. Читатель, уже открывший
//! старый файл, дочитывает старое содержимое.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::debug;

use super::{ObjectMeta, ObjectStore, PutOptions, RemoteObject};
use crate::lock::{acquire_lock, LockMode};
use crate::version::format_http_date;

const META_SUFFIX: &str = ".meta.json";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create object store root {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under root. Empty, absolute and `..` keys are
    /// rejected, as are keys naming the root itself (".", "./.").
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(anyhow!("empty object key"));
        }
        let rel = Path::new(key);
        let mut named = false;
        for c in rel.components() {
            match c {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                _ => return Err(anyhow!("invalid object key '{}'", key)),
            }
        }
        if !named {
            return Err(anyhow!("object key '{}' names no object", key));
        }
        if key.ends_with(META_SUFFIX) || key.ends_with(TMP_SUFFIX) || key == "LOCK" {
            return Err(anyhow!("reserved object key '{}'", key));
        }
        Ok(self.root.join(rel))
    }

    fn sidecar_path(obj: &Path) -> PathBuf {
        with_suffix(obj, META_SUFFIX)
    }

    fn read_meta(obj: &Path) -> Result<Option<ObjectMeta>> {
        let p = Self::sidecar_path(obj);
        match fs::read(&p) {
            Ok(bytes) => {
                let meta: ObjectMeta = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parse {}", p.display()))?;
                Ok(Some(meta))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", p.display())),
        }
    }
}

fn with_suffix(p: &Path, suffix: &str) -> PathBuf {
    let mut s = p.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = with_suffix(path, TMP_SUFFIX);
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .with_context(|| format!("open {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write {}", tmp.display()))?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, key: &str) -> Result<RemoteObject> {
        let path = self.object_path(key)?;
        let _lock = acquire_lock(&self.root, LockMode::Shared)?;

        let file = File::open(&path).with_context(|| format!("open object {}", path.display()))?;
        let size = file.metadata()?.len();
        // Нет sidecar — нет Last-Modified; решать будет загрузчик.
        let meta = Self::read_meta(&path)?.unwrap_or(ObjectMeta {
            size,
            ..ObjectMeta::default()
        });
        debug!("fs store: fetch key={} size={}", key, size);

        Ok(RemoteObject {
            body: Box::new(file),
            meta,
        })
    }

    fn store(&self, key: &str, body: Vec<u8>, opts: &PutOptions) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let meta = ObjectMeta {
            last_modified: Some(format_http_date(Utc::now())),
            content_type: Some(opts.content_type.clone()),
            content_encoding: opts.content_encoding.clone(),
            size: body.len() as u64,
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        let _lock = acquire_lock(&self.root, LockMode::Exclusive)?;
        write_replace(&path, &body)?;
        write_replace(&Self::sidecar_path(&path), &meta_json)?;
        debug!("fs store: stored key={} bytes={}", key, body.len());
        Ok(())
    }
}
