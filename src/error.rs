//! Typed errors of the snapshot core.
//!
//! Коллабораторы (remote storage, KV store) возвращают `anyhow::Error`;
//! здесь они классифицируются, чтобы вызывающий мог отличить "не найдено"
//! (штатная ситуация при lookup) от инфраструктурного сбоя.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport/storage failure, missing or unparsable Last-Modified.
    #[error("fetch '{key}': {source:#}")]
    Fetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("decompress: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("write snapshot file {}: {source}", .path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open store {}: {source:#}", .path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Handle is closed, closing, or never held a store.
    #[error("partition unavailable")]
    Unavailable,

    #[error("bucket '{}' not found", String::from_utf8_lossy(.bucket))]
    BucketNotFound { bucket: Vec<u8> },

    #[error(
        "key '{}' not found in bucket '{}'",
        String::from_utf8_lossy(.key),
        String::from_utf8_lossy(.bucket)
    )]
    KeyNotFound { bucket: Vec<u8>, key: Vec<u8> },

    #[error("read transaction: {0:#}")]
    StoreRead(#[source] anyhow::Error),

    #[error("close store: {0:#}")]
    StoreClose(#[source] anyhow::Error),

    #[error("remove snapshot file {}: {source}", .path.display())]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compress: {0}")]
    Compress(#[source] std::io::Error),

    #[error("upload '{key}': {source:#}")]
    Upload {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("read {}: {source}", .path.display())]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fieldless classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Fetch,
    Decompress,
    LocalWrite,
    StoreOpen,
    Unavailable,
    BucketNotFound,
    KeyNotFound,
    StoreRead,
    StoreClose,
    RemoveFile,
    Compress,
    Upload,
    LocalRead,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch { .. } => ErrorKind::Fetch,
            Error::Decompress(_) => ErrorKind::Decompress,
            Error::LocalWrite { .. } => ErrorKind::LocalWrite,
            Error::StoreOpen { .. } => ErrorKind::StoreOpen,
            Error::Unavailable => ErrorKind::Unavailable,
            Error::BucketNotFound { .. } => ErrorKind::BucketNotFound,
            Error::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            Error::StoreRead(_) => ErrorKind::StoreRead,
            Error::StoreClose(_) => ErrorKind::StoreClose,
            Error::RemoveFile { .. } => ErrorKind::RemoveFile,
            Error::Compress(_) => ErrorKind::Compress,
            Error::Upload { .. } => ErrorKind::Upload,
            Error::LocalRead { .. } => ErrorKind::LocalRead,
        }
    }

    /// Benign lookup miss (skip), as opposed to an infrastructure failure (alert).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BucketNotFound { .. } | Error::KeyNotFound { .. })
    }
}
