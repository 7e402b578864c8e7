//! ⚙️ The ChunkProcessor: one offset in, one file out (or a polite "nothing left").
//!
//! 🎬 *[a cursor points at id 40. the fetcher is summoned. ten rows answer.]*
//!
//! Each call is independent. It fetches the rows after `offset`, dresses them in the
//! feed schema, squeezes them through gzip, names the file after the clock and the
//! offset, and hands the bytes to the Saver. It does NOT touch the manifest. Whoever
//! called it decides what the outcome means for the run.
//!
//! 🧠 Knowledge graph:
//! - Depends on: [`Fetcher`], [`Saver`], `transforms::FacilityFeed`, `codec`, `manifest`
//! - Used by: `feed::FeedDriver`, one spawned task per offset
//! - Shared across tasks behind an `Arc`; every field is read-only after construction

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backends::{Fetcher, FetcherBackend, ObjectPayload, Saver, SaverBackend};
use crate::codec;
use crate::common::unix_timestamp;
use crate::manifest::chunk_file_name;
use crate::transforms::{FacilityFeed, RecordTransform};

/// 🚦 What one chunk amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChunkOutcome {
    /// 🏁 No rows past this offset. The feed is done.
    Exhausted,
    /// ✅ The store acknowledged the file.
    Uploaded { file_name: String, rows: usize },
    /// 🚫 The file was built but the store said no.
    Rejected { file_name: String },
}

/// ⚙️ Fetch, transform, encode, upload. Once per offset.
#[derive(Debug)]
pub(crate) struct ChunkProcessor {
    fetcher: Arc<FetcherBackend>,
    saver: Arc<SaverBackend>,
    chunk_size: usize,
    table: String,
    file_prefix: String,
}

impl ChunkProcessor {
    pub(crate) fn new(
        fetcher: Arc<FetcherBackend>,
        saver: Arc<SaverBackend>,
        chunk_size: usize,
        table: &str,
        file_prefix: &str,
    ) -> Self {
        Self {
            fetcher,
            saver,
            chunk_size,
            table: table.to_string(),
            file_prefix: file_prefix.to_string(),
        }
    }

    /// 📦 Process the chunk that starts strictly after `offset`.
    ///
    /// A rejected upload is an outcome, not an error. `Err` is reserved for things that
    /// went wrong before there was anything to upload: a failed fetch, a row that would
    /// not decode, a codec that fell over.
    pub(crate) async fn process(&self, offset: i64) -> Result<ChunkOutcome> {
        let rows = self
            .fetcher
            .fetch(offset, self.chunk_size, &self.table)
            .await
            .context(format!("💀 Fetching the chunk after offset {offset} failed"))?;

        if rows.is_empty() {
            debug!("🏁 No rows after offset {}, the table has run dry", offset);
            return Ok(ChunkOutcome::Exhausted);
        }

        let row_count = rows.len();
        let records = rows.iter().map(FacilityFeed::transform).collect();
        let json = codec::serialize(records)?;
        let bytes = codec::compress(json)
            .await
            .context(format!("💀 Compressing the chunk after offset {offset} failed"))?;

        let file_name = chunk_file_name(&self.file_prefix, unix_timestamp(), offset);
        debug!(
            "📤 Uploading {} ({} rows, {} bytes gzipped)",
            file_name,
            row_count,
            bytes.len()
        );

        if self.saver.save(ObjectPayload::Gzip(bytes), &file_name).await {
            Ok(ChunkOutcome::Uploaded {
                file_name,
                rows: row_count,
            })
        } else {
            warn!("🚫 The store rejected {} (offset {})", file_name, offset);
            Ok(ChunkOutcome::Rejected { file_name })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::in_mem::{InMemoryFetcher, InMemorySaver};
    use crate::common::{ChunkPayload, fixtures};

    fn the_processor(fetcher: InMemoryFetcher, saver: InMemorySaver, chunk_size: usize) -> ChunkProcessor {
        ChunkProcessor::new(
            Arc::new(FetcherBackend::InMemory(fetcher)),
            Arc::new(SaverBackend::InMemory(saver)),
            chunk_size,
            "facility",
            "facility_feed",
        )
    }

    #[tokio::test]
    async fn the_one_where_two_chunks_land_and_the_third_finds_nothing() -> Result<()> {
        let the_saver = InMemorySaver::new();
        let the_processor = the_processor(InMemoryFetcher::new(fixtures::facilities(20)), the_saver.clone(), 10);

        let the_first = the_processor.process(0).await?;
        let the_second = the_processor.process(10).await?;
        let the_third = the_processor.process(20).await?;

        assert!(matches!(the_first, ChunkOutcome::Uploaded { rows: 10, .. }));
        assert!(matches!(the_second, ChunkOutcome::Uploaded { rows: 10, .. }));
        assert_eq!(the_third, ChunkOutcome::Exhausted);
        assert_eq!(the_saver.names().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_uploaded_bytes_unzip_into_the_right_rows() -> Result<()> {
        let the_saver = InMemorySaver::new();
        let the_processor = the_processor(InMemoryFetcher::new(fixtures::facilities(15)), the_saver.clone(), 10);

        let ChunkOutcome::Uploaded { file_name, rows } = the_processor.process(10).await? else {
            panic!("💀 expected the chunk after 10 to upload");
        };
        assert_eq!(rows, 5);
        assert!(file_name.starts_with("facility_feed_"));
        assert!(file_name.ends_with("_10.json.gz"));

        let Some(ObjectPayload::Gzip(the_bytes)) = the_saver.payload(&file_name).await else {
            panic!("💀 expected a gzip payload under {file_name}");
        };
        let the_payload: ChunkPayload = serde_json::from_str(&codec::decompress(&the_bytes)?)?;
        let the_ids: Vec<&str> = the_payload.data.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(the_ids, vec!["11", "12", "13", "14", "15"]);
        assert_eq!(the_payload.data[0].location.latitude, "40.712895");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_store_says_no_and_nobody_panics() -> Result<()> {
        let the_saver = InMemorySaver::rejecting(|_| true);
        let the_processor = the_processor(InMemoryFetcher::new(fixtures::facilities(3)), the_saver.clone(), 10);

        let the_outcome = the_processor.process(0).await?;
        assert!(matches!(the_outcome, ChunkOutcome::Rejected { .. }));
        assert!(the_saver.names().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_fetch_blows_up_and_says_so() {
        let the_fetcher = InMemoryFetcher::new(fixtures::facilities(30)).failing_at(10);
        let the_saver = InMemorySaver::new();
        let the_processor = the_processor(the_fetcher, the_saver.clone(), 10);

        assert!(the_processor.process(10).await.is_err());
        assert!(the_saver.names().await.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_an_empty_chunk_never_reaches_the_store() -> Result<()> {
        let the_saver = InMemorySaver::new();
        let the_processor = the_processor(InMemoryFetcher::new(Vec::new()), the_saver.clone(), 10);

        assert_eq!(the_processor.process(0).await?, ChunkOutcome::Exhausted);
        assert!(the_saver.names().await.is_empty());
        Ok(())
    }
}
