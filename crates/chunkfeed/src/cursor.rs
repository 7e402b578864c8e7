//! 🧭 Cursor Bootstrap: where does this run start?
//!
//! Two answers, checked in order:
//! 1. The operator said so (`offset_initial`). Trust them. No lookup.
//! 2. Ask the table for its smallest id and start one below it, so the first
//!    "ids strictly greater than offset" fetch includes that smallest row.
//!    An empty table starts at 0 and ends one fetch later.
//!
//! A failed lookup is fatal. No chunk runs without a starting point.

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::backends::Fetcher;

/// 🧭 Resolve the exclusive lower bound for the first chunk.
pub(crate) async fn resolve_start_offset<F>(
    configured: Option<i64>,
    table: &str,
    fetcher: &F,
) -> Result<i64>
where
    F: Fetcher + ?Sized,
{
    if let Some(offset) = configured {
        info!("🧭 Resuming from configured offset {}", offset);
        return Ok(offset);
    }

    let smallest = fetcher
        .min_key(table)
        .await
        .context(format!("💀 Could not discover a starting offset for '{table}'"))?;

    let offset = match smallest {
        Some(min_key) => min_key.checked_sub(1).ok_or_else(|| {
            anyhow!("💀 The smallest id in '{table}' is {min_key}; there is no offset below it")
        })?,
        None => 0,
    };
    info!("🧭 Starting from discovered offset {} (min id {:?})", offset, smallest);
    Ok(offset)
}
