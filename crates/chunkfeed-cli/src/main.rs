//! 🚀 chunkfeed-cli: the front door of chunkfeed.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Loads config, sets up logging, runs one export, prints what happened. The real
//! work lives in the library. Like a manager. 🦆

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// 🚀 main(): the "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (`RUST_LOG` wins, `info` otherwise)
/// 2. Pick the config file: first argument, else `chunkfeed.toml` if it exists
/// 3. Load config (env vars `CHUNKFEED_*` fill in the rest)
/// 4. Run the export, unless someone hits Ctrl-C first
/// 5. Print the summary, or peel the error onion and exit 1
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let path_arg = args.get(1).map(String::as_str).unwrap_or("chunkfeed.toml");

    // 🔒 A missing file is fine, the environment may carry everything
    let config_file = std::path::Path::new(path_arg);
    let config_file_if_it_exists = match config_file.try_exists().context(format!(
        "💀 Couldn't check whether the configuration file exists. Was checking here: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => {
            warn!(
                "⚠️ No config file at '{}', reading CHUNKFEED_* environment variables only",
                config_file.display()
            );
            None
        }
    };

    let app_config = chunkfeed::app_config::load_config(config_file_if_it_exists)
        .context("💀 In chunkfeed-cli, main, we couldn't load the configuration. Check the file and the CHUNKFEED_* variables.")?;

    // 🛑 Ctrl-C drops the run mid-flight. Chunks already uploaded stay, no manifest is written.
    let result = tokio::select! {
        result = chunkfeed::run(app_config) => result,
        _ = tokio::signal::ctrl_c() => {
            error!("🛑 Interrupted. Uploaded chunks remain but no manifest lists them.");
            std::process::exit(130);
        }
    };

    match result {
        Ok(report) => {
            println!("{}", summary_table(&report));
            if !report.stop_reason.is_clean() {
                warn!("⚠️ The feed stopped early: {:?}", report.stop_reason);
            }
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("pool timed out")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }
            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: looks like the database isn't reachable. Check host, port and \
                    credentials, or `docker compose up -d` if it lives in a container. ☕"
                );
            }
            std::process::exit(1);
        }
    }
}

/// 📊 The receipt, formatted for humans.
fn summary_table(report: &chunkfeed::FeedReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["📊 chunkfeed", "value"]);
    table.add_row(vec!["start offset".to_string(), report.start_offset.to_string()]);
    table.add_row(vec!["chunks uploaded".to_string(), report.chunks_uploaded.to_string()]);
    table.add_row(vec!["rows exported".to_string(), report.rows_exported.to_string()]);
    table.add_row(vec!["stopped".to_string(), format!("{:?}", report.stop_reason)]);
    table.add_row(vec![
        "manifest".to_string(),
        format!(
            "{} ({})",
            report.manifest_file_name,
            if report.manifest_saved { "saved" } else { "NOT saved" }
        ),
    ]);
    table.add_row(vec!["elapsed".to_string(), format!("{:.2?}", report.elapsed)]);
    table
}
