// tests/loader_failures.rs
//
// Неудачная загрузка не оставляет файлов в temp_dir:
// - нет Last-Modified / мусор в Last-Modified -> Fetch;
// - не gzip -> Decompress;
// - валидный gzip, но не образ хранилища -> StoreOpen;
// - обрыв gzip-потока посередине -> Decompress;
// - мусор после последнего gzip member -> Decompress;
// - валидный gzip обрезанного образа хранилища -> StoreOpen (не паника);
// - temp_dir недоступен для записи -> LocalWrite.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use flate2::{write::GzEncoder, Compression};

use infreqdb::{write_index, CacheConfig, ErrorKind, MemObjectStore, SnapshotLoader};

const LM: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("infreqtest-loadfail-{prefix}-{pid}-{t}-{id}"))
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes)?;
    Ok(enc.finish()?)
}

fn leftover_files(dir: &Path) -> usize {
    match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).count(),
        Err(_) => 0,
    }
}

fn setup(prefix: &str) -> (PathBuf, Arc<MemObjectStore>, SnapshotLoader) {
    let root = unique_root(prefix);
    let remote = Arc::new(MemObjectStore::new());
    let loader = SnapshotLoader::new(
        remote.clone(),
        CacheConfig::default().with_temp_dir(&root),
    );
    (root, remote, loader)
}

/// Raw bytes of a small valid store image, built outside the loader's temp_dir.
fn store_image(prefix: &str) -> Result<Vec<u8>> {
    let dir = unique_root(prefix);
    fs::create_dir_all(&dir)?;
    let src = dir.join("src.db");
    let mut b = BTreeMap::new();
    for i in 0..256 {
        b.insert(format!("k{i}").into_bytes(), vec![b'v'; 64]);
    }
    let mut buckets = BTreeMap::new();
    buckets.insert("b".to_string(), b);
    write_index(&src, &buckets)?;
    let raw = fs::read(&src)?;
    let _ = fs::remove_dir_all(&dir);
    Ok(raw)
}

#[test]
fn missing_last_modified_is_fetch_error() -> Result<()> {
    let (root, remote, loader) = setup("no-lm");
    remote.put_raw("k", gzip(b"whatever")?, None);

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert!(!e.is_not_found());
    assert_eq!(leftover_files(&root), 0);

    // пустая строка — то же самое, что отсутствие
    remote.put_raw("k", gzip(b"whatever")?, Some("  "));
    assert_eq!(loader.load("k").unwrap_err().kind(), ErrorKind::Fetch);
    assert_eq!(leftover_files(&root), 0);
    Ok(())
}

#[test]
fn unparsable_last_modified_is_fetch_error() -> Result<()> {
    let (root, remote, loader) = setup("bad-lm");
    remote.put_raw("k", gzip(b"whatever")?, Some("last tuesday, probably"));

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert!(e.to_string().contains("last tuesday"), "got: {}", e);
    assert_eq!(leftover_files(&root), 0);
    Ok(())
}

#[test]
fn missing_object_is_fetch_error() -> Result<()> {
    let (root, _remote, loader) = setup("no-obj");
    let e = loader.load("absent").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert_eq!(leftover_files(&root), 0);
    Ok(())
}

#[test]
fn not_gzip_is_decompress_error() -> Result<()> {
    let (root, remote, loader) = setup("not-gz");
    remote.put_raw("k", b"definitely not a gzip stream".to_vec(), Some(LM));

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Decompress);
    assert_eq!(leftover_files(&root), 0);
    Ok(())
}

#[test]
fn truncated_gzip_is_decompress_error() -> Result<()> {
    let (root, remote, loader) = setup("trunc-gz");
    // Несжимаемые данные, чтобы обрыв пришёлся на середину deflate-потока.
    let mut payload = Vec::with_capacity(512 * 1024);
    let mut x: u32 = 0x1234_5678;
    for _ in 0..payload.capacity() {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        payload.push((x & 0xff) as u8);
    }
    let gz = gzip(&payload)?;
    remote.put_raw("k", gz[..gz.len() / 2].to_vec(), Some(LM));

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Decompress);
    assert_eq!(leftover_files(&root), 0);
    Ok(())
}

#[test]
fn gzip_of_garbage_is_store_open_error() -> Result<()> {
    let (root, remote, loader) = setup("not-store");
    let garbage = b"this is not a store image ".repeat(1024);
    remote.put_raw("k", gzip(&garbage)?, Some(LM));

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::StoreOpen);
    // temp_dir был создан, но файл снапшота удалён
    assert!(root.exists());
    assert_eq!(leftover_files(&root), 0);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn trailing_junk_after_gzip_is_decompress_error() -> Result<()> {
    let (root, remote, loader) = setup("trailing-junk");
    let mut body = gzip(&store_image("trailing-junk-src")?)?;
    body.extend_from_slice(b"trailing junk that is not another gzip member");
    remote.put_raw("k", body, Some(LM));

    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Decompress);
    assert_eq!(leftover_files(&root), 0);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn gzip_of_truncated_image_is_store_open_error() -> Result<()> {
    let (root, remote, loader) = setup("trunc-image");
    let raw = store_image("trunc-image-src")?;
    remote.put_raw("p", gzip(&raw[..raw.len() / 2])?, Some(LM));

    let e = loader.load("p").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::StoreOpen);
    assert_eq!(leftover_files(&root), 0);

    // тот же loader продолжает работать
    remote.put_raw("p", gzip(&raw)?, Some(LM));
    let part = loader.load("p")?;
    assert_eq!(part.get(b"b", b"k7")?, vec![b'v'; 64]);
    part.close()?;
    assert_eq!(leftover_files(&root), 0);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn unwritable_temp_dir_is_local_write_error() -> Result<()> {
    let root = unique_root("local-write");
    fs::create_dir_all(&root)?;
    // temp_dir — обычный файл: каталог создать нельзя
    let blocker = root.join("not-a-dir");
    fs::write(&blocker, b"x")?;

    let remote = Arc::new(MemObjectStore::new());
    remote.put_raw("k", gzip(b"whatever")?, Some(LM));
    let loader = SnapshotLoader::new(
        remote.clone(),
        CacheConfig::default().with_temp_dir(&blocker),
    );
    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::LocalWrite);
    assert_eq!(fs::read(&blocker)?, b"x".to_vec());
    assert_eq!(leftover_files(&root), 1);

    // temp-файл не создаётся: префикс указывает в несуществующий подкаталог
    let tmp = root.join("tmp");
    let loader = SnapshotLoader::new(
        remote,
        CacheConfig::default()
            .with_temp_dir(&tmp)
            .with_temp_prefix("missing-subdir/part-"),
    );
    let e = loader.load("k").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::LocalWrite);
    assert_eq!(leftover_files(&tmp), 0);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
