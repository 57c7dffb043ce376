// Базовые модули
pub mod config;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod version;

// Коллабораторы: удалённое хранилище объектов и локальное KV
pub mod remote;
pub mod store;

// Ядро: жизненный цикл снапшота
pub mod loader;
pub mod partition;
pub mod publisher;

// Удобные реэкспорты
pub use config::CacheConfig;
pub use error::{Error, ErrorKind, Result};
pub use loader::SnapshotLoader;
pub use partition::{HandleState, PartitionHandle};
pub use publisher::SnapshotPublisher;
pub use remote::{FsObjectStore, MemObjectStore, ObjectMeta, ObjectStore, PutOptions, RemoteObject};
pub use store::{write_index, BucketRef, KvStore, ReadTx, RedbStore};
pub use version::{format_http_date, parse_version_marker};
