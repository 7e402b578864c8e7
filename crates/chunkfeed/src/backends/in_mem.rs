//! # Previously, on Chunkfeed...
//!
//! 🎬 The database was down for maintenance. The bucket was in another region. The test
//! suite still had to run. Someone had to pretend to be both.
//!
//! `in_mem` provides an in-memory [`Fetcher`] and [`Saver`] for tests. The
//! [`InMemoryFetcher`] pages through a `Vec<RawRecord>` with the same keyset contract
//! as Postgres, and keeps score: how many calls, how many at once. The
//! [`InMemorySaver`] hoards every payload behind an `Arc<Mutex<...>>` so tests can
//! peek inside after the pipeline is done with it.
//!
//! ⚠️ This is NOT for production. This is for tests. 🦆

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::backends::{Fetcher, ObjectPayload, Saver};
use crate::common::RawRecord;

/// 📦 A table that lives in a `Vec`, sorted by `id` on the way in.
#[derive(Debug, Default)]
pub(crate) struct InMemoryFetcher {
    rows: Vec<RawRecord>,
    /// 🐌 Optional per-offset latency, to shuffle completion order on purpose.
    latency: Option<fn(i64) -> Duration>,
    /// 💀 Offsets whose fetch blows up instead of answering.
    failing_offsets: Vec<i64>,
    fail_min_key: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryFetcher {
    pub(crate) fn new(mut rows: Vec<RawRecord>) -> Self {
        rows.sort_by_key(|row| row.id);
        Self {
            rows,
            ..Self::default()
        }
    }

    pub(crate) fn with_latency(mut self, latency: fn(i64) -> Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn failing_at(mut self, offset: i64) -> Self {
        self.failing_offsets.push(offset);
        self
    }

    pub(crate) fn with_broken_min_key(mut self) -> Self {
        self.fail_min_key = true;
        self
    }

    /// 📊 Total `fetch` calls so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 📊 The most `fetch` calls that were ever running at the same moment.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, offset: i64, limit: usize, _table: &str) -> Result<Vec<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        // 🐌 always yield once so concurrent fetches actually overlap
        match self.latency {
            Some(latency) => tokio::time::sleep(latency(offset)).await,
            None => tokio::time::sleep(Duration::from_millis(5)).await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_offsets.contains(&offset) {
            bail!("💀 simulated fetch failure at offset {offset}");
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| row.id > offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn min_key(&self, _table: &str) -> Result<Option<i64>> {
        if self.fail_min_key {
            bail!("💀 simulated min-key lookup failure");
        }
        Ok(self.rows.first().map(|row| row.id))
    }
}

/// 📦 A bucket that never forgets. Clone it before handing it off; clones share the vault.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySaver {
    pub(crate) saved: Arc<tokio::sync::Mutex<Vec<(String, ObjectPayload)>>>,
    /// 🚫 Names matching this predicate get a `false` instead of a home.
    reject: Option<fn(&str) -> bool>,
}

impl InMemorySaver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rejecting(reject: fn(&str) -> bool) -> Self {
        Self {
            reject: Some(reject),
            ..Self::default()
        }
    }

    /// 📋 Every accepted object name, in the order it arrived.
    pub(crate) async fn names(&self) -> Vec<String> {
        self.saved.lock().await.iter().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) async fn payload(&self, name: &str) -> Option<ObjectPayload> {
        self.saved
            .lock()
            .await
            .iter()
            .find(|(saved_name, _)| saved_name == name)
            .map(|(_, payload)| payload.clone())
    }
}

#[async_trait]
impl Saver for InMemorySaver {
    async fn save(&self, payload: ObjectPayload, name: &str) -> bool {
        if self.reject.is_some_and(|reject| reject(name)) {
            return false;
        }
        // 🔒 The Mutex is load-bearing. Chunk tasks save concurrently.
        self.saved.lock().await.push((name.to_string(), payload));
        true
    }
}
