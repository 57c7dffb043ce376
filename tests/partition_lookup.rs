// tests/partition_lookup.rs
//
// Lookups поверх загруженного снапшота:
// - b/k -> v, отсутствующий ключ, отсутствующий бакет;
// - publish(fileA, "k") + load("k") отдаёт ровно пары fileA;
// - version_marker = Last-Modified удалённого объекта;
// - объект из нескольких gzip member-ов читается целиком.
//
// Запуск:
//   cargo test --test partition_lookup -- --nocapture

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use chrono::{TimeZone, Utc};
use flate2::{write::GzEncoder, Compression};

use infreqdb::{
    parse_version_marker, write_index, CacheConfig, ErrorKind, MemObjectStore, SnapshotLoader,
    SnapshotPublisher,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("infreqtest-lookup-{prefix}-{pid}-{t}-{id}"))
}

type Buckets = BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

fn buckets(pairs: &[(&str, &str, &str)]) -> Buckets {
    let mut out = Buckets::new();
    for (b, k, v) in pairs {
        out.entry(b.to_string())
            .or_default()
            .insert(k.as_bytes().to_vec(), v.as_bytes().to_vec());
    }
    out
}

fn gzip_file(path: &Path) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(&raw)?;
    Ok(enc.finish()?)
}

#[test]
fn bucket_key_scenario() -> Result<()> {
    let root = unique_root("scenario");
    fs::create_dir_all(&root)?;
    let src = root.join("index.db");
    write_index(&src, &buckets(&[("b", "k", "v")]))?;

    let remote = Arc::new(MemObjectStore::new());
    remote.put_raw("part-0", gzip_file(&src)?, Some("Sun, 06 Nov 1994 08:49:37 GMT"));

    let loader = SnapshotLoader::new(
        remote.clone(),
        CacheConfig::default().with_temp_dir(root.join("tmp")),
    );
    let part = loader.load("part-0")?;

    assert_eq!(part.get(b"b", b"k")?, b"v".to_vec());

    let e = part.get(b"b", b"missing").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::KeyNotFound);
    assert!(e.is_not_found());

    let e = part.get(b"missing-bucket", b"k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::BucketNotFound);

    // не-UTF8 имя бакета не может существовать
    let e = part.get(&[0xff, 0xfe], b"k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::BucketNotFound);

    assert_eq!(
        part.version_marker(),
        Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()
    );
    assert_eq!(part.remote_key(), "part-0");
    assert!(part.local_path().starts_with(root.join("tmp")));

    part.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn publish_then_load_roundtrip() -> Result<()> {
    let root = unique_root("roundtrip");
    fs::create_dir_all(&root)?;
    let file_a = root.join("a.db");

    let mut data = Buckets::new();
    for b in 0..3 {
        let bucket = data.entry(format!("bucket-{b}")).or_default();
        for i in 0..200u32 {
            let v = format!("value-{b}-{i}").repeat((i % 7 + 1) as usize);
            bucket.insert(i.to_be_bytes().to_vec(), v.into_bytes());
        }
    }
    // бинарное значение
    data.entry("raw".to_string())
        .or_default()
        .insert(b"zeros".to_vec(), vec![0u8; 4096]);
    write_index(&file_a, &data)?;

    let remote = Arc::new(MemObjectStore::new());
    let cfg = CacheConfig::default().with_temp_dir(root.join("tmp"));

    let publisher = SnapshotPublisher::new(remote.clone(), cfg.clone());
    let gz_len = publisher.publish(&file_a, "k")?;
    assert_eq!(gz_len, remote.get_raw("k").map(|b| b.len() as u64).unwrap_or(0));

    let meta = remote.meta("k").expect("object stored");
    assert_eq!(meta.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(meta.content_type.as_deref(), Some(cfg.content_type.as_str()));

    let part = SnapshotLoader::new(remote.clone(), cfg).load("k")?;
    for (bucket, pairs) in &data {
        for (k, v) in pairs {
            assert_eq!(&part.get(bucket.as_bytes(), k)?, v);
        }
    }
    let lm = meta.last_modified.expect("last-modified set by store");
    assert_eq!(part.version_marker(), parse_version_marker(&lm)?);

    part.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn multi_member_gzip_loads_whole_image() -> Result<()> {
    let root = unique_root("multi-member");
    fs::create_dir_all(&root)?;
    let src = root.join("index.db");
    let mut data = Buckets::new();
    let bucket = data.entry("b".to_string()).or_default();
    for i in 0..500u32 {
        bucket.insert(format!("k{i}").into_bytes(), format!("v{i}").repeat(8).into_bytes());
    }
    write_index(&src, &data)?;
    let raw = fs::read(&src)?;

    // два независимых member-а подряд, как у `cat a.gz b.gz`
    let (head, tail) = raw.split_at(raw.len() / 3);
    let mut body = Vec::new();
    for piece in [head, tail] {
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(piece)?;
        body.extend_from_slice(&enc.finish()?);
    }

    let remote = Arc::new(MemObjectStore::new());
    remote.put_raw("mm", body, Some("Sun, 06 Nov 1994 08:49:37 GMT"));
    let part = SnapshotLoader::new(remote, CacheConfig::default().with_temp_dir(root.join("tmp")))
        .load("mm")?;

    for (k, v) in &data["b"] {
        assert_eq!(&part.get(b"b", k)?, v);
    }

    part.close()?;
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn republish_replaces_object() -> Result<()> {
    let root = unique_root("replace");
    fs::create_dir_all(&root)?;
    let v1 = root.join("v1.db");
    let v2 = root.join("v2.db");
    write_index(&v1, &buckets(&[("b", "k", "old")]))?;
    write_index(&v2, &buckets(&[("b", "k", "new"), ("b", "k2", "added")]))?;

    let remote: Arc<MemObjectStore> = Arc::new(MemObjectStore::new());
    let cfg = CacheConfig::default().with_temp_dir(root.join("tmp"));
    let publisher = SnapshotPublisher::new(remote.clone(), cfg.clone());
    let loader = SnapshotLoader::new(remote.clone(), cfg);

    publisher.publish(&v1, "p")?;
    let old = loader.load("p")?;
    publisher.publish(&v2, "p")?;
    let new = loader.load("p")?;
    assert_eq!(remote.len(), 1);

    // старый снапшот продолжает обслуживать свою версию
    assert_eq!(old.get(b"b", b"k")?, b"old".to_vec());
    assert_eq!(old.get(b"b", b"k2").unwrap_err().kind(), ErrorKind::KeyNotFound);
    assert_eq!(new.get(b"b", b"k")?, b"new".to_vec());
    assert_eq!(new.get(b"b", b"k2")?, b"added".to_vec());
    assert_ne!(old.local_path(), new.local_path());

    old.close()?;
    assert_eq!(new.get(b"b", b"k")?, b"new".to_vec());
    new.close()?;

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn publish_missing_file_is_local_read_error() -> Result<()> {
    let root = unique_root("missing-src");
    let remote = Arc::new(MemObjectStore::new());
    let publisher = SnapshotPublisher::new(remote.clone(), CacheConfig::default());
    let e = publisher
        .publish(&root.join("nope.db"), "k")
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::LocalRead);
    assert!(remote.is_empty());
    Ok(())
}
