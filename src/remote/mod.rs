//! Remote object storage seam.
//!
//! Ядро использует только fetch/store; аутентификация, ретраи и листинг
//! остаются на стороне конкретной реализации.

use std::io::Read;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod fs;
pub mod mem;

pub use fs::FsObjectStore;
pub use mem::MemObjectStore;

/// Object metadata as returned by a fetch (and persisted by stores that keep it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Raw HTTP-date string; parsed by the loader, not by the store.
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub size: u64,
}

pub struct RemoteObject {
    pub body: Box<dyn Read + Send>,
    pub meta: ObjectMeta,
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject").field("meta", &self.meta).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub content_encoding: Option<String>,
}

impl PutOptions {
    pub fn gzip(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_encoding: Some("gzip".to_string()),
        }
    }
}

pub trait ObjectStore: Send + Sync {
    /// Open the object at `key` for streaming reads.
    fn fetch(&self, key: &str) -> Result<RemoteObject>;

    /// Replace the object at `key` with `body` (single-object PUT).
    fn store(&self, key: &str, body: Vec<u8>, opts: &PutOptions) -> Result<()>;
}
