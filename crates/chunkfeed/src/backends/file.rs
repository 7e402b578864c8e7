// ai
//! 📂 File Saver: an object store made of a directory.
//!
//! For dry runs and local development: every payload becomes a file under
//! `directory`, named exactly like its S3 key would be. Keys with slashes grow
//! subdirectories. Gzip payloads stay gzip; `zcat` works on them.
//!
//! ⚠️ Existing files with the same name are overwritten. No warning. No backup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, trace};

use crate::backends::{ObjectPayload, Saver};

#[derive(Debug, Deserialize, Clone)]
pub struct FileSaverConfig {
    /// 📁 Root directory. Created on startup if missing.
    pub directory: PathBuf,
}

/// 📂 Writes each payload to `<directory>/<name>`.
#[derive(Debug, Clone)]
pub(crate) struct FileSaver {
    directory: PathBuf,
}

impl FileSaver {
    pub(crate) async fn new(config: &FileSaverConfig) -> Result<Self> {
        fs::create_dir_all(&config.directory).await.context(format!(
            "💀 The output directory '{}' could not be created. \
             We stared at the path. The path stared back.",
            config.directory.display()
        ))?;
        Ok(Self {
            directory: config.directory.clone(),
        })
    }

    async fn write(&self, payload: ObjectPayload, name: &str) -> Result<()> {
        let target = self.directory.join(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, payload.into_bytes())
            .await
            .context(format!("💀 Could not write '{}'", target.display()))
    }
}

#[async_trait]
impl Saver for FileSaver {
    async fn save(&self, payload: ObjectPayload, name: &str) -> bool {
        let size = payload.len();
        match self.write(payload, name).await {
            Ok(()) => {
                trace!("📬 {} bytes written to {}", size, name);
                true
            }
            Err(err) => {
                error!("💀 File saver failed on '{}': {:#}", name, err);
                false
            }
        }
    }
}
