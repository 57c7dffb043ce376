//! Centralized configuration for snapshot loading/publishing.
//!
//! - CacheConfig::from_env() reads INFREQ_* env vars.
//! - Fluent `with_*` setters override single fields (builder-style).
//!
//! Defaults:
//! - temp_dir = std::env::temp_dir()
//! - temp_prefix = "infreqdb-"
//! - gzip_level = 6
//! - content_type = "application/octet-stream"

use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_TEMP_PREFIX: &str = "infreqdb-";
pub const DEFAULT_GZIP_LEVEL: u32 = 6;
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Directory for decompressed snapshot files.
    /// Env: INFREQ_TEMP_DIR (default: OS temp dir)
    pub temp_dir: PathBuf,

    /// File name prefix of snapshot files.
    /// Env: INFREQ_TEMP_PREFIX (default "infreqdb-")
    pub temp_prefix: String,

    /// Gzip level used by the publisher (0..=9).
    /// Env: INFREQ_GZIP_LEVEL (default 6; out-of-range values are ignored)
    pub gzip_level: u32,

    /// Content-Type attached to uploaded objects.
    /// Env: INFREQ_CONTENT_TYPE
    pub content_type: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            gzip_level: DEFAULT_GZIP_LEVEL,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("INFREQ_TEMP_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.temp_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("INFREQ_TEMP_PREFIX") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.temp_prefix = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("INFREQ_GZIP_LEVEL") {
            if let Ok(n) = v.trim().parse::<u32>() {
                if n <= 9 {
                    cfg.gzip_level = n;
                }
            }
        }

        if let Ok(v) = std::env::var("INFREQ_CONTENT_TYPE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.content_type = s.to_string();
            }
        }

        cfg
    }

    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_temp_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Clamped to 9.
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level.min(9);
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, ct: S) -> Self {
        self.content_type = ct.into();
        self
    }

    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheConfig {{ temp_dir: {}, temp_prefix: {}, gzip_level: {}, content_type: {} }}",
            self.temp_dir.display(),
            self.temp_prefix,
            self.gzip_level,
            self.content_type,
        )
    }
}
