use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use infreqdb::{CacheConfig, FsObjectStore, ObjectStore, SnapshotLoader};

/// Value argument: "hex:..", "b64:..", "@file" or a literal UTF-8 string.
pub fn decode_value_arg(arg: &str) -> Result<Vec<u8>> {
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        return std::fs::read(&path).with_context(|| format!("read value file {}", path.display()));
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        return decode_hex(hx);
    }
    if let Some(b) = arg.strip_prefix("b64:") {
        return B64
            .decode(b.trim())
            .map_err(|e| anyhow!("invalid base64: {}", e));
    }
    Ok(arg.as_bytes().to_vec())
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex string must have even length"));
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(s.len() / 2);
    for i in (0..bytes.len()).step_by(2) {
        let h = (bytes[i] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i))?;
        let l = (bytes[i + 1] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i + 1))?;
        out.push(((h << 4) | l) as u8);
    }
    Ok(out)
}

/// Percent-decode one URL path segment into raw bytes ("%2F" -> b'/').
pub fn percent_decode(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let pair = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| anyhow!("truncated escape at pos {}", i))?;
        let h = (pair[0] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid escape at pos {}", i))?;
        let l = (pair[1] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid escape at pos {}", i))?;
        out.push(((h << 4) | l) as u8);
        i += 3;
    }
    Ok(out)
}

pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

pub fn to_base64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

pub fn open_remote(store: &Path) -> Result<Arc<dyn ObjectStore>> {
    Ok(Arc::new(FsObjectStore::open(store)?))
}

pub fn loader(store: &Path) -> Result<SnapshotLoader> {
    Ok(SnapshotLoader::new(open_remote(store)?, CacheConfig::from_env()))
}
