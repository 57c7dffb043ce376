use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI для снапшотов infreqdb (локальное файловое хранилище объектов)
#[derive(Parser, Debug)]
#[command(name = "infreqdb", version, about = "infreqdb snapshot CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Build an index file from JSON
    ///
    /// JSON формат (bucket -> key -> value):
    /// {
    ///   "users": {"alice": "1", "bin": "hex:deadbeef", "b": "b64:AAE="},
    ///   "blobs": {"f": "@./file.bin"}
    /// }
    Build {
        /// Output index file (created or overwritten)
        #[arg(long)]
        out: PathBuf,
        /// JSON file with buckets
        #[arg(long)]
        json: PathBuf,
    },
    /// Compress a local index file and upload it
    Publish {
        /// Object store root directory
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Load a snapshot, look up one key, retire the snapshot
    Get {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        bucket: String,
        /// Key to look up inside the bucket
        #[arg(long)]
        lookup: String,
        /// JSON output (value as base64)
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Optional file to write raw value into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load a snapshot and print its version marker
    Info {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Serve lookups over HTTP from one loaded snapshot
    ///
    /// Маршруты:
    ///   GET /get/<bucket>/<key>  — значение (404 если нет, 503 если закрыт)
    ///   GET /metrics             — Prometheus text
    ///   GET /health              — OK
    Serve {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "127.0.0.1:9797")]
        addr: String,
        /// Worker threads
        #[arg(long, default_value_t = 4)]
        threads: usize,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Cli as Parser>::parse()
    }
}
