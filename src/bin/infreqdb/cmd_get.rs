use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use super::util::{display_text, loader, to_base64};

pub fn exec(
    store: PathBuf,
    key: String,
    bucket: String,
    lookup: String,
    json: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let part = loader(&store)?.load(&key)?;
    let res = part.get(bucket.as_bytes(), lookup.as_bytes());
    // Закрываем до печати: close удаляет локальный файл снапшота.
    part.close()?;

    let value = match res {
        Ok(v) => v,
        Err(e) if e.is_not_found() => {
            if json {
                let obj = serde_json::json!({
                    "bucket": bucket,
                    "key": lookup,
                    "found": false,
                    "reason": e.to_string(),
                });
                println!("{}", serde_json::to_string(&obj)?);
            } else {
                println!("NOT FOUND: {}", e);
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(out_path) = out {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        f.write_all(&value)?;
        f.sync_all()?;
        println!(
            "FOUND '{}/{}': {} B -> wrote to {}",
            bucket,
            lookup,
            value.len(),
            out_path.display()
        );
    } else if json {
        let obj = serde_json::json!({
            "bucket": bucket,
            "key": lookup,
            "found": true,
            "version": part.version_marker().to_rfc3339(),
            "value_b64": to_base64(&value),
        });
        println!("{}", serde_json::to_string(&obj)?);
    } else {
        println!("FOUND '{}/{}': {} B", bucket, lookup, value.len());
        println!("text: {}", display_text(&value));
    }
    Ok(())
}
