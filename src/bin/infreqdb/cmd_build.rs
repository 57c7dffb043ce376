use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

use infreqdb::write_index;

use super::util::decode_value_arg;

pub fn exec(out: PathBuf, json: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&json).with_context(|| format!("read {}", json.display()))?;
    let doc: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", json.display()))?;
    let obj = doc
        .as_object()
        .ok_or_else(|| anyhow!("top-level JSON must be an object of buckets"))?;

    let mut buckets: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>> = BTreeMap::new();
    let mut pairs = 0usize;
    for (bucket, entries) in obj {
        let entries = entries
            .as_object()
            .ok_or_else(|| anyhow!("bucket '{}' must be an object", bucket))?;
        let dst = buckets.entry(bucket.clone()).or_default();
        for (k, v) in entries {
            let v = v
                .as_str()
                .ok_or_else(|| anyhow!("value of '{}/{}' must be a string", bucket, k))?;
            dst.insert(k.as_bytes().to_vec(), decode_value_arg(v)?);
            pairs += 1;
        }
    }

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_index(&out, &buckets)?;
    println!(
        "built {}: {} bucket(s), {} pair(s)",
        out.display(),
        buckets.len(),
        pairs
    );
    Ok(())
}
