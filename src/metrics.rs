//! Lightweight global metrics.
//!
//! Потокобезопасные атомарные счётчики (Relaxed). Только запись со стороны
//! ядра: логика PartitionHandle их никогда не читает.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Load -----
static LOADS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LOADS_FAILED: AtomicU64 = AtomicU64::new(0);
static LOAD_BYTES: AtomicU64 = AtomicU64::new(0);

// ----- Publish -----
static PUBLISHES_TOTAL: AtomicU64 = AtomicU64::new(0);
static PUBLISHES_FAILED: AtomicU64 = AtomicU64::new(0);
static PUBLISH_BYTES: AtomicU64 = AtomicU64::new(0);

// ----- Lookups -----
static GETS_TOTAL: AtomicU64 = AtomicU64::new(0);
static GETS_HIT: AtomicU64 = AtomicU64::new(0);
static GETS_NOT_FOUND: AtomicU64 = AtomicU64::new(0);
static GETS_UNAVAILABLE: AtomicU64 = AtomicU64::new(0);

// ----- Lifecycle -----
static PARTITIONS_ACTIVE: AtomicU64 = AtomicU64::new(0);
static PARTITIONS_CLOSED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub loads_total: u64,
    pub loads_failed: u64,
    pub load_bytes: u64,

    pub publishes_total: u64,
    pub publishes_failed: u64,
    pub publish_bytes: u64,

    pub gets_total: u64,
    pub gets_hit: u64,
    pub gets_not_found: u64,
    pub gets_unavailable: u64,

    pub partitions_active: u64,
    pub partitions_closed: u64,
}

impl MetricsSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.gets_hit + self.gets_not_found;
        if total == 0 {
            0.0
        } else {
            self.gets_hit as f64 / total as f64
        }
    }
}

pub fn record_load(decompressed_bytes: u64) {
    LOADS_TOTAL.fetch_add(1, Ordering::Relaxed);
    LOAD_BYTES.fetch_add(decompressed_bytes, Ordering::Relaxed);
}

pub fn record_load_failed() {
    LOADS_FAILED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_publish(compressed_bytes: u64) {
    PUBLISHES_TOTAL.fetch_add(1, Ordering::Relaxed);
    PUBLISH_BYTES.fetch_add(compressed_bytes, Ordering::Relaxed);
}

pub fn record_publish_failed() {
    PUBLISHES_FAILED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_get_hit() {
    GETS_TOTAL.fetch_add(1, Ordering::Relaxed);
    GETS_HIT.fetch_add(1, Ordering::Relaxed);
}

pub fn record_get_not_found() {
    GETS_TOTAL.fetch_add(1, Ordering::Relaxed);
    GETS_NOT_FOUND.fetch_add(1, Ordering::Relaxed);
}

pub fn record_get_unavailable() {
    GETS_TOTAL.fetch_add(1, Ordering::Relaxed);
    GETS_UNAVAILABLE.fetch_add(1, Ordering::Relaxed);
}

pub fn record_get_other() {
    GETS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_partition_open() {
    PARTITIONS_ACTIVE.fetch_add(1, Ordering::Relaxed);
}

pub fn record_partition_closed() {
    PARTITIONS_ACTIVE
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
        .ok();
    PARTITIONS_CLOSED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        loads_total: LOADS_TOTAL.load(Ordering::Relaxed),
        loads_failed: LOADS_FAILED.load(Ordering::Relaxed),
        load_bytes: LOAD_BYTES.load(Ordering::Relaxed),
        publishes_total: PUBLISHES_TOTAL.load(Ordering::Relaxed),
        publishes_failed: PUBLISHES_FAILED.load(Ordering::Relaxed),
        publish_bytes: PUBLISH_BYTES.load(Ordering::Relaxed),
        gets_total: GETS_TOTAL.load(Ordering::Relaxed),
        gets_hit: GETS_HIT.load(Ordering::Relaxed),
        gets_not_found: GETS_NOT_FOUND.load(Ordering::Relaxed),
        gets_unavailable: GETS_UNAVAILABLE.load(Ordering::Relaxed),
        partitions_active: PARTITIONS_ACTIVE.load(Ordering::Relaxed),
        partitions_closed: PARTITIONS_CLOSED.load(Ordering::Relaxed),
    }
}

/// Prometheus text exposition of the current counters.
pub fn render_prometheus(m: &MetricsSnapshot) -> String {
    let mut out = String::new();
    let ver = env!("CARGO_PKG_VERSION");
    let _ = writeln!(out, "# HELP infreqdb_build_info Build info.");
    let _ = writeln!(out, "# TYPE infreqdb_build_info gauge");
    let _ = writeln!(out, "infreqdb_build_info{{version=\"{}\"}} 1", ver);

    let rows: [(&str, &str, &str, u64); 12] = [
        ("infreqdb_loads_total", "counter", "Snapshot loads completed.", m.loads_total),
        ("infreqdb_loads_failed", "counter", "Snapshot loads failed.", m.loads_failed),
        ("infreqdb_load_bytes", "counter", "Decompressed bytes written to snapshot files.", m.load_bytes),
        ("infreqdb_publishes_total", "counter", "Snapshots published.", m.publishes_total),
        ("infreqdb_publishes_failed", "counter", "Snapshot publishes failed.", m.publishes_failed),
        ("infreqdb_publish_bytes", "counter", "Compressed bytes uploaded.", m.publish_bytes),
        ("infreqdb_gets_total", "counter", "Point lookups.", m.gets_total),
        ("infreqdb_gets_hit", "counter", "Lookups that returned a value.", m.gets_hit),
        ("infreqdb_gets_not_found", "counter", "Lookups with missing bucket or key.", m.gets_not_found),
        ("infreqdb_gets_unavailable", "counter", "Lookups rejected by a closed partition.", m.gets_unavailable),
        ("infreqdb_partitions_active", "gauge", "Open partition handles.", m.partitions_active),
        ("infreqdb_partitions_closed", "counter", "Partition handles retired.", m.partitions_closed),
    ];
    for (name, ty, help, v) in rows {
        let _ = writeln!(out, "# HELP {} {}", name, help);
        let _ = writeln!(out, "# TYPE {} {}", name, ty);
        let _ = writeln!(out, "{} {}", name, v);
    }

    let _ = writeln!(out, "# HELP infreqdb_hit_ratio Hits over hits+not_found.");
    let _ = writeln!(out, "# TYPE infreqdb_hit_ratio gauge");
    let _ = writeln!(out, "infreqdb_hit_ratio {:.4}", m.hit_ratio());
    out
}
