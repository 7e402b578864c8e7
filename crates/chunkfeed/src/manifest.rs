// ai
//! 📜 Manifest: the receipt at the end of the run.
//!
//! Chunk files get names like `facility_feed_1700000000_40.json.gz`: a prefix, the
//! wall-clock second the chunk started, and the offset it started after. When the
//! loop is done, every name that made it goes into one small JSON document:
//!
//! ```json
//! {"generation_timestamp": 1700000123, "name": "reservewithgoogle.entity",
//!  "data_file": ["facility_feed_1700000000_0.json.gz", "..."]}
//! ```
//!
//! The manifest is uploaded uncompressed under a templated name, with `{timestamp}`
//! replaced by the same `generation_timestamp`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 🏷️ The placeholder in the manifest file-name template.
pub(crate) const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// 📛 `<prefix>_<timestamp>_<offset>.json.gz`
pub(crate) fn chunk_file_name(prefix: &str, timestamp: i64, offset: i64) -> String {
    format!("{prefix}_{timestamp}_{offset}.json.gz")
}

/// 📛 Interpolate `{timestamp}` into the manifest file-name template.
pub(crate) fn manifest_file_name(template: &str, timestamp: i64) -> String {
    template.replace(TIMESTAMP_PLACEHOLDER, &timestamp.to_string())
}

/// 📜 The end-of-run metadata document. Key order is wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataManifest {
    pub generation_timestamp: i64,
    pub name: String,
    pub data_file: Vec<String>,
}

impl MetadataManifest {
    pub(crate) fn new(generation_timestamp: i64, name: &str, data_file: Vec<String>) -> Self {
        Self {
            generation_timestamp,
            name: name.to_string(),
            data_file,
        }
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("💀 The manifest refused to serialize")
    }
}
