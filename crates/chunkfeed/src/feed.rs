//! 🎬 *[the cursor wakes up. it has one job: keep walking until the table runs out.]*
//!
//! 🚚 The FeedDriver: part dispatcher, part accountant, sole keeper of the manifest.
//!
//! ```text
//!  BOOTSTRAPPING ──► RUNNING ──► FINALIZING ──► DONE
//!        │
//!        └──► FAILED (no starting offset, no run)
//! ```
//!
//! While RUNNING, the semaphore is the concurrency bound: a chunk task is spawned only
//! once it holds one of `concurrency_limit` permits, and gives it back the moment it
//! finishes. Results come back through a `FuturesOrdered`, so they are read in the
//! order they were dispatched no matter who finished first. A slow head chunk does not
//! stall dispatch: finished chunks behind it wait in the ordered queue, up to
//! `concurrency_limit * REORDER_WINDOW_PER_PERMIT` of them. The manifest list is
//! appended only here, only in that order.
//!
//! The first result that is not an upload ends dispatch. Any task that sees one raises
//! a shared halt flag so the driver stops scheduling new offsets before the ordered
//! queue gets there. Tasks already in flight are still awaited; whatever they produce
//! after the stopping point is discarded.
//!
//! ⚠️ With a limit above 1, chunks past the end (or past a failure) may be fetched
//! speculatively while the stopping chunk is still running, at most one reorder window's
//! worth, and a few may even upload. None of them reach the manifest. With a limit of 1
//! the halt flag is raised before the permit is released, so nothing is speculative.

use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream::FuturesOrdered;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app_config::RuntimeConfig;
use crate::backends::{FetcherBackend, ObjectPayload, Saver, SaverBackend};
use crate::common::unix_timestamp;
use crate::cursor::resolve_start_offset;
use crate::manifest::{MetadataManifest, manifest_file_name};
use crate::processor::{ChunkOutcome, ChunkProcessor};

/// 🪟 How many dispatched-but-unread chunks may pile up behind a slow one, per permit.
/// Finished chunks only hold a file name here, so the window is about bounding
/// speculation past the end, not memory.
const REORDER_WINDOW_PER_PERMIT: usize = 4;

/// 🛑 Why the run stopped dispatching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 🏁 The chunk after `offset` was empty. The happy ending.
    Exhausted { offset: i64 },
    /// 🚫 The store refused the file for the chunk after `offset`.
    Rejected { offset: i64, file_name: String },
    /// 💀 The chunk after `offset` errored before it could upload.
    Failed { offset: i64, reason: String },
}

impl StopReason {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// 📊 What a run did, for the operator and for tests.
#[derive(Debug, Clone)]
pub struct FeedReport {
    pub start_offset: i64,
    pub chunks_uploaded: usize,
    pub rows_exported: usize,
    pub stop_reason: StopReason,
    pub manifest_file_name: String,
    pub manifest: MetadataManifest,
    /// ⚠️ `false` is logged, never fatal.
    pub manifest_saved: bool,
    pub elapsed: Duration,
}

/// 🚚 Drives one run from bootstrap to manifest.
#[derive(Debug)]
pub(crate) struct FeedDriver {
    fetcher: Arc<FetcherBackend>,
    saver: Arc<SaverBackend>,
    processor: Arc<ChunkProcessor>,
    runtime: RuntimeConfig,
}

impl FeedDriver {
    pub(crate) fn new(fetcher: Arc<FetcherBackend>, saver: Arc<SaverBackend>, runtime: RuntimeConfig) -> Self {
        let processor = Arc::new(ChunkProcessor::new(
            Arc::clone(&fetcher),
            Arc::clone(&saver),
            runtime.chunk_size,
            &runtime.db_table_name,
            &runtime.file_prefix,
        ));
        Self {
            fetcher,
            saver,
            processor,
            runtime,
        }
    }

    /// 🚀 Run the feed. Errors only if the starting offset cannot be found; every later
    /// problem is folded into the [`FeedReport`].
    pub(crate) async fn run(&self) -> Result<FeedReport> {
        let started = Instant::now();

        // 🧭 BOOTSTRAPPING
        let start_offset = resolve_start_offset(
            self.runtime.offset_initial,
            &self.runtime.db_table_name,
            self.fetcher.as_ref(),
        )
        .await
        .context("💀 The feed could not bootstrap. No chunks were attempted.")?;

        info!(
            "🚀 Feed starting at offset {} (chunk_size={}, concurrency_limit={}, table={})",
            start_offset, self.runtime.chunk_size, self.runtime.concurrency_limit, self.runtime.db_table_name
        );

        // 🏃 RUNNING
        let mut data_file = Vec::new();
        let mut rows_exported = 0;
        let stop_reason = self.dispatch_until_stopped(start_offset, &mut data_file, &mut rows_exported).await;

        match &stop_reason {
            StopReason::Exhausted { offset } => info!("🏁 Table exhausted after offset {}", offset),
            StopReason::Rejected { offset, file_name } => {
                warn!("🚫 Stopped at offset {}: upload of {} was rejected", offset, file_name)
            }
            StopReason::Failed { offset, reason } => error!("💀 Stopped at offset {}: {}", offset, reason),
        }

        // 📜 FINALIZING
        let generation_timestamp = unix_timestamp();
        let manifest_name = manifest_file_name(&self.runtime.metadata_file_name, generation_timestamp);
        let chunks_uploaded = data_file.len();
        let manifest = MetadataManifest::new(generation_timestamp, &self.runtime.feed_name, data_file);
        let manifest_saved = self.save_manifest(&manifest, &manifest_name).await;

        // ✅ DONE
        let elapsed = started.elapsed();
        info!(
            "✅ Feed done: {} chunks, {} rows, manifest {} ({}) in {:.2?}",
            chunks_uploaded,
            rows_exported,
            manifest_name,
            if manifest_saved { "saved" } else { "NOT saved" },
            elapsed
        );

        Ok(FeedReport {
            start_offset,
            chunks_uploaded,
            rows_exported,
            stop_reason,
            manifest_file_name: manifest_name,
            manifest,
            manifest_saved,
            elapsed,
        })
    }

    async fn dispatch_until_stopped(
        &self,
        start_offset: i64,
        data_file: &mut Vec<String>,
        rows_exported: &mut usize,
    ) -> StopReason {
        let limit = self.runtime.concurrency_limit;
        let window = limit.saturating_mul(REORDER_WINDOW_PER_PERMIT);
        let step = self.runtime.chunk_size as i64;
        let gate = Arc::new(Semaphore::new(limit));
        let halt = Arc::new(AtomicBool::new(false));
        let mut in_flight: FuturesOrdered<JoinHandle<Result<ChunkOutcome>>> = FuturesOrdered::new();
        // 📋 offsets of `in_flight`, front to back; both queues pop in dispatch order
        let mut in_flight_offsets: VecDeque<i64> = VecDeque::new();
        // 🧭 `None` once the cursor cannot advance without passing i64::MAX
        let mut next_offset = Some(start_offset);
        let mut last_offset = start_offset;
        let mut stop_reason: Option<StopReason> = None;

        loop {
            let may_dispatch = stop_reason.is_none()
                && next_offset.is_some()
                && !halt.load(Ordering::SeqCst)
                && in_flight.len() < window;
            if !may_dispatch && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                    let offset = in_flight_offsets.pop_front().unwrap_or(last_offset);
                    if stop_reason.is_some() {
                        debug!("🗑️ Discarding the result for offset {}, the run already stopped", offset);
                        continue;
                    }
                    stop_reason = match joined {
                        Ok(Ok(ChunkOutcome::Uploaded { file_name, rows })) => {
                            debug!("✅ Chunk after offset {} uploaded as {} ({} rows)", offset, file_name, rows);
                            data_file.push(file_name);
                            *rows_exported += rows;
                            None
                        }
                        Ok(Ok(ChunkOutcome::Exhausted)) => Some(StopReason::Exhausted { offset }),
                        Ok(Ok(ChunkOutcome::Rejected { file_name })) => Some(StopReason::Rejected { offset, file_name }),
                        Ok(Err(err)) => Some(StopReason::Failed {
                            offset,
                            reason: format!("{err:#}"),
                        }),
                        Err(join_err) => Some(StopReason::Failed {
                            offset,
                            reason: format!("chunk task died: {join_err}"),
                        }),
                    };
                }

                acquired = Arc::clone(&gate).acquire_owned(), if may_dispatch => {
                    let (Ok(permit), Some(offset)) = (acquired, next_offset) else {
                        // 🔒 the gate is never closed and `may_dispatch` saw an offset
                        continue;
                    };
                    // 🛑 the permit may have come from a task that just raised the flag
                    if halt.load(Ordering::SeqCst) {
                        drop(permit);
                        continue;
                    }
                    let processor = Arc::clone(&self.processor);
                    let task_halt = Arc::clone(&halt);
                    debug!("📤 Dispatching chunk after offset {}", offset);

                    let handle = tokio::spawn(async move {
                        let outcome = processor.process(offset).await;
                        if !matches!(outcome, Ok(ChunkOutcome::Uploaded { .. })) {
                            task_halt.store(true, Ordering::SeqCst);
                        }
                        // 🔒 the halt flag is raised before the permit goes back
                        drop(permit);
                        outcome
                    });
                    in_flight.push_back(handle);
                    in_flight_offsets.push_back(offset);
                    last_offset = offset;
                    next_offset = offset.checked_add(step);
                }

                else => break,
            }
        }

        stop_reason.unwrap_or_else(|| StopReason::Failed {
            offset: last_offset,
            reason: format!("the cursor cannot advance {step} past {last_offset} without overflowing i64"),
        })
    }

    async fn save_manifest(&self, manifest: &MetadataManifest, manifest_name: &str) -> bool {
        let json = match manifest.to_json() {
            Ok(json) => json,
            Err(err) => {
                error!("💀 Could not serialize manifest {}: {:#}", manifest_name, err);
                return false;
            }
        };
        let saved = self.saver.save(ObjectPayload::Json(json), manifest_name).await;
        if !saved {
            error!(
                "💀 Manifest {} was not saved. {} chunk files are orphaned until the next run.",
                manifest_name,
                manifest.data_file.len()
            );
        }
        saved
    }
}
