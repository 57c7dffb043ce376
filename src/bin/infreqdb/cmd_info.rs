use anyhow::Result;
use std::path::PathBuf;

use infreqdb::format_http_date;

use super::util::loader;

pub fn exec(store: PathBuf, key: String, json: bool) -> Result<()> {
    let part = loader(&store)?.load(&key)?;
    let version = part.version_marker();
    let local = part.local_path().display().to_string();
    let size = std::fs::metadata(part.local_path()).map(|m| m.len()).unwrap_or(0);
    part.close()?;

    if json {
        let obj = serde_json::json!({
            "key": key,
            "version": version.to_rfc3339(),
            "last_modified": format_http_date(version),
            "snapshot_bytes": size,
            "local_path": local,
        });
        println!("{}", serde_json::to_string(&obj)?);
    } else {
        println!("key:           {}", key);
        println!("last-modified: {}", format_http_date(version));
        println!("snapshot:      {} B at {} (removed)", size, local);
    }
    Ok(())
}
