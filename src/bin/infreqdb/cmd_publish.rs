use anyhow::Result;
use std::path::PathBuf;

use infreqdb::{CacheConfig, SnapshotPublisher};

use super::util::open_remote;

pub fn exec(store: PathBuf, key: String, file: PathBuf) -> Result<()> {
    let publisher = SnapshotPublisher::new(open_remote(&store)?, CacheConfig::from_env());
    let n = publisher.publish(&file, &key)?;
    println!("published {} -> {} ({} B gz)", file.display(), key, n);
    Ok(())
}
