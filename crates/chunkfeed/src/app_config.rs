//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment. Built once at process start, validated once, then passed
//! by value into the feed. Nobody inside the pipeline goes looking for settings on
//! their own; there is no global to find.

use anyhow::{Context, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::backends::{FileSaverConfig, PostgresSourceConfig, S3SinkConfig};

/// 📏 No chunk bigger than this, whatever the config says. Larger values are clamped.
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// 🔒 Tables the feed is allowed to read. The name ends up inside SQL, so it is
/// checked against this list before any connection is opened.
pub const ALLOWED_TABLES: &[&str] = &["facility"];

/// 📦 One struct to rule them all.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source_config: SourceConfig,
    pub sink_config: SinkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🚰 Where rows come from.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfig {
    Postgres(PostgresSourceConfig),
}

/// 🕳️ Where chunk files and the manifest go.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum SinkConfig {
    S3(S3SinkConfig),
    File(FileSaverConfig),
}

/// 🎛️ The knobs of the feed itself.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 📦 Rows per chunk file. Clamped to [`MAX_CHUNK_SIZE`].
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 🚦 How many chunks may be in flight at once.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// 🧭 Explicit resume point. `None` = start just below the smallest id.
    #[serde(default)]
    pub offset_initial: Option<i64>,
    /// 🗃️ Source table. Must be in [`ALLOWED_TABLES`].
    #[serde(default = "default_db_table_name", alias = "table_name")]
    pub db_table_name: String,
    /// 📜 Manifest file name; `{timestamp}` is replaced at upload time.
    #[serde(default = "default_metadata_file_name")]
    pub metadata_file_name: String,
    /// 📛 Chunk files are named `<file_prefix>_<timestamp>_<offset>.json.gz`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// 🏷️ The `name` field written into the manifest.
    #[serde(default = "default_feed_name")]
    pub feed_name: String,
}

fn default_chunk_size() -> usize {
    10
}

fn default_concurrency_limit() -> usize {
    10
}

fn default_db_table_name() -> String {
    "facility".to_string()
}

fn default_metadata_file_name() -> String {
    "metadata_{timestamp}.json".to_string()
}

fn default_file_prefix() -> String {
    "facility_feed".to_string()
}

fn default_feed_name() -> String {
    "reservewithgoogle.entity".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            concurrency_limit: default_concurrency_limit(),
            offset_initial: None,
            db_table_name: default_db_table_name(),
            metadata_file_name: default_metadata_file_name(),
            file_prefix: default_file_prefix(),
            feed_name: default_feed_name(),
        }
    }
}

impl RuntimeConfig {
    /// ✅ Reject what cannot run, clamp what is merely too big.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        if self.chunk_size == 0 {
            bail!("💀 chunk_size must be positive. A chunk of nothing is a very long loop.");
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            warn!(
                "⚠️ chunk_size {} exceeds the maximum, clamping to {}",
                self.chunk_size, MAX_CHUNK_SIZE
            );
            self.chunk_size = MAX_CHUNK_SIZE;
        }
        if self.concurrency_limit == 0 {
            bail!("💀 concurrency_limit must be positive. Zero permits means zero progress.");
        }
        if !ALLOWED_TABLES.contains(&self.db_table_name.as_str()) {
            bail!(
                "💀 Invalid table name: '{}'. Allowed: {:?}",
                self.db_table_name,
                ALLOWED_TABLES
            );
        }
        if !self.metadata_file_name.contains(crate::manifest::TIMESTAMP_PLACEHOLDER) {
            warn!(
                "⚠️ metadata_file_name '{}' has no {{timestamp}}; each run overwrites the last manifest",
                self.metadata_file_name
            );
        }
        Ok(self)
    }
}

/// 🚀 Load the config: env vars (`CHUNKFEED_*`, nested keys split on `__`) plus an
/// optional TOML file. TOML wins on conflicts.
///
/// 📐 `None` → env vars only. No file, no assumptions, no default path sneaking in.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CHUNKFEED_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CHUNKFEED_*).",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CHUNKFEED_*). \
                 No file was provided, this one's all on the environment."
            .to_string(),
    };

    let mut app_config: AppConfig = config.extract().context(context_msg)?;
    app_config.runtime = app_config
        .runtime
        .validated()
        .context("💀 The runtime section parsed, but it cannot run")?;
    Ok(app_config)
}
