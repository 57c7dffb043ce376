//! In-process object store (tests, embedding).

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Result};
use chrono::Utc;

use super::{ObjectMeta, ObjectStore, PutOptions, RemoteObject};
use crate::version::format_http_date;

#[derive(Debug, Clone)]
struct Entry {
    body: Arc<Vec<u8>>,
    meta: ObjectMeta,
}

#[derive(Debug, Default)]
pub struct MemObjectStore {
    objects: Mutex<HashMap<String, Entry>>,
}

impl MemObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw bytes with an arbitrary (possibly absent or malformed)
    /// Last-Modified value.
    pub fn put_raw(&self, key: &str, body: Vec<u8>, last_modified: Option<&str>) {
        let meta = ObjectMeta {
            last_modified: last_modified.map(str::to_string),
            content_type: None,
            content_encoding: None,
            size: body.len() as u64,
        };
        self.lock().insert(
            key.to_string(),
            Entry {
                body: Arc::new(body),
                meta,
            },
        );
    }

    /// Stored bytes (as uploaded, i.e. still compressed).
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).map(|e| e.body.as_ref().clone())
    }

    pub fn meta(&self, key: &str) -> Option<ObjectMeta> {
        self.lock().get(key).map(|e| e.meta.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectStore for MemObjectStore {
    fn fetch(&self, key: &str) -> Result<RemoteObject> {
        let entry = self
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("no such key '{}'", key))?;
        // Cursor over a shared buffer: no copy of the payload per fetch.
        Ok(RemoteObject {
            body: Box::new(Cursor::new(SharedBytes(entry.body))),
            meta: entry.meta,
        })
    }

    fn store(&self, key: &str, body: Vec<u8>, opts: &PutOptions) -> Result<()> {
        let meta = ObjectMeta {
            last_modified: Some(format_http_date(Utc::now())),
            content_type: Some(opts.content_type.clone()),
            content_encoding: opts.content_encoding.clone(),
            size: body.len() as u64,
        };
        self.lock().insert(
            key.to_string(),
            Entry {
                body: Arc::new(body),
                meta,
            },
        );
        Ok(())
    }
}

struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}
