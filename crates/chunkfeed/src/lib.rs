//! 🚚 chunkfeed: walk a table in primary-key order, ship it to an object store as
//! gzipped JSON chunks, then leave a manifest saying what was shipped.
//!
//! 🎬 *[a table with a hundred thousand facilities. a bucket with none. a cursor at zero.]*
//!
//! 🧠 Knowledge graph:
//! - `app_config`: figment-loaded [`AppConfig`], validated once, passed by value
//! - `backends`: `Fetcher` (Postgres) and `Saver` (S3, local dir) traits + enums
//! - `cursor`: where the run starts
//! - `processor`: one offset → fetch → transform → codec → save
//! - `feed`: the driver; concurrency gate, ordered results, manifest
//! - `transforms`, `codec`, `manifest`, `common`: pure helpers and wire types

pub mod app_config;
mod backends;
mod codec;
mod common;
mod cursor;
mod feed;
mod manifest;
mod processor;
mod transforms;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub use crate::app_config::{AppConfig, RuntimeConfig, SinkConfig, SourceConfig};
pub use crate::codec::decompress;
pub use crate::backends::{FileSaverConfig, PostgresSourceConfig, S3SinkConfig};
pub use crate::common::{Address, ChunkPayload, Location, RawRecord, TransformedRecord};
pub use crate::feed::{FeedReport, StopReason};
pub use crate::manifest::MetadataManifest;

use crate::backends::{FetcherBackend, SaverBackend};
use crate::feed::FeedDriver;

/// 🚀 Run one feed export end to end.
///
/// Fails only before the first chunk: unreachable source, unusable sink, or no starting
/// offset. Once chunks are flowing, trouble is reported in the [`FeedReport`].
pub async fn run(app_config: AppConfig) -> Result<FeedReport> {
    info!("🚚 chunkfeed starting up");

    let fetcher = Arc::new(
        FetcherBackend::from_config(&app_config.source_config)
            .await
            .context("💀 Failed to connect to the source database")?,
    );
    let saver = Arc::new(
        SaverBackend::from_config(&app_config.sink_config)
            .await
            .context("💀 Failed to prepare the object store sink")?,
    );

    let driver = FeedDriver::new(Arc::clone(&fetcher), saver, app_config.runtime);
    let report = driver.run().await;

    // 🗑️ close the pool whether or not the run made it past bootstrap
    fetcher.close().await;
    report
}
