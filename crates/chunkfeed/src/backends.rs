//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Fetchers pour rows out of a table, Savers slurp bytes into an object store.
//! The chunk pipeline in between never learns which is which. That's the point.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls → backend enum → `from_config` resolver
//! - [`Fetcher`]: `PostgresFetcher` (sqlx pool), `InMemoryFetcher` (tests)
//! - [`Saver`]: `S3Saver` (aws-sdk-s3), `FileSaver` (local dir), `InMemorySaver` (tests)
//! - Both traits take `&self`: one fetcher and one saver are shared by every in-flight
//!   chunk task behind an `Arc`. The pool and the S3 client are reentrant already.
//!
//! 🦆 The duck is here because every file must have one.

use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::{SinkConfig, SourceConfig};
use crate::common::RawRecord;

pub(crate) mod file;
#[cfg(test)]
pub(crate) mod in_mem;
pub(crate) mod postgres;
pub(crate) mod s3;

pub use file::FileSaverConfig;
pub use postgres::PostgresSourceConfig;
pub use s3::S3SinkConfig;

// ===== Fetcher Trait and Backend Enum =====

/// 🚰 A source of raw rows, walked in primary-key order.
///
/// # Contract 📜
/// - `fetch` returns rows with `id > offset`, ascending by `id`, at most `limit` of them.
/// - An empty `Vec` means the table is exhausted past `offset`. It is NOT an error.
/// - `Err(...)` means the fetch itself went sideways. Distinguishable from empty, always.
/// - `min_key` returns the smallest `id` in `table`, or `None` when the table is empty.
#[async_trait]
pub(crate) trait Fetcher: std::fmt::Debug + Send + Sync {
    async fn fetch(&self, offset: i64, limit: usize, table: &str) -> Result<Vec<RawRecord>>;

    async fn min_key(&self, table: &str) -> Result<Option<i64>>;
}

/// 🎭 The many faces of a Fetcher, dispatched statically.
#[derive(Debug)]
pub(crate) enum FetcherBackend {
    Postgres(postgres::PostgresFetcher),
    #[cfg(test)]
    InMemory(in_mem::InMemoryFetcher),
}

impl FetcherBackend {
    /// 🏗️ Build the fetcher the config asks for. Connects eagerly so a bad DSN fails at
    /// startup, not forty chunks in.
    pub(crate) async fn from_config(config: &SourceConfig) -> Result<Self> {
        match config {
            SourceConfig::Postgres(postgres_config) => Ok(Self::Postgres(
                postgres::PostgresFetcher::connect(postgres_config).await?,
            )),
        }
    }

    /// 🗑️ Release pooled connections, if any.
    pub(crate) async fn close(&self) {
        match self {
            Self::Postgres(fetcher) => fetcher.close().await,
            #[cfg(test)]
            Self::InMemory(_) => {}
        }
    }
}

#[async_trait]
impl Fetcher for FetcherBackend {
    async fn fetch(&self, offset: i64, limit: usize, table: &str) -> Result<Vec<RawRecord>> {
        match self {
            Self::Postgres(fetcher) => fetcher.fetch(offset, limit, table).await,
            #[cfg(test)]
            Self::InMemory(fetcher) => fetcher.fetch(offset, limit, table).await,
        }
    }

    async fn min_key(&self, table: &str) -> Result<Option<i64>> {
        match self {
            Self::Postgres(fetcher) => fetcher.min_key(table).await,
            #[cfg(test)]
            Self::InMemory(fetcher) => fetcher.min_key(table).await,
        }
    }
}

// ===== Saver Trait and Backend Enum =====

/// 📦 What gets written to the object store.
///
/// Chunk files are gzip bytes; the manifest is plain JSON text. The distinction rides
/// along so stores that care (S3) can set `Content-Encoding` correctly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ObjectPayload {
    Gzip(Vec<u8>),
    Json(String),
}

impl ObjectPayload {
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Gzip(bytes) => bytes,
            Self::Json(text) => text.into_bytes(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Gzip(bytes) => bytes.len(),
            Self::Json(text) => text.len(),
        }
    }

    pub(crate) fn content_encoding(&self) -> Option<&'static str> {
        match self {
            Self::Gzip(_) => Some("gzip"),
            Self::Json(_) => None,
        }
    }
}

/// 🕳️ An object store that accepts named payloads.
///
/// # Contract 📜
/// - Returns `true` iff the store acknowledged the write (2xx or equivalent).
/// - Anything else is `false`. Not an error. Implementations log the why.
#[async_trait]
pub(crate) trait Saver: std::fmt::Debug + Send + Sync {
    async fn save(&self, payload: ObjectPayload, name: &str) -> bool;
}

/// 🎭 The many faces of a Saver. Mirrors [`FetcherBackend`] on the other end.
#[derive(Debug)]
pub(crate) enum SaverBackend {
    S3(s3::S3Saver),
    File(file::FileSaver),
    #[cfg(test)]
    InMemory(in_mem::InMemorySaver),
}

impl SaverBackend {
    pub(crate) async fn from_config(config: &SinkConfig) -> Result<Self> {
        match config {
            SinkConfig::S3(s3_config) => Ok(Self::S3(s3::S3Saver::new(s3_config).await)),
            SinkConfig::File(file_config) => Ok(Self::File(file::FileSaver::new(file_config).await?)),
        }
    }
}

#[async_trait]
impl Saver for SaverBackend {
    async fn save(&self, payload: ObjectPayload, name: &str) -> bool {
        match self {
            Self::S3(saver) => saver.save(payload, name).await,
            Self::File(saver) => saver.save(payload, name).await,
            #[cfg(test)]
            Self::InMemory(saver) => saver.save(payload, name).await,
        }
    }
}
