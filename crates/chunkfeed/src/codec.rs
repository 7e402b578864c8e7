// ai
//! 🫁 Chunk Codec: JSON in, gzip out.
//!
//! The codec takes a batch of transformed records, wraps them in `{"data": [...]}`,
//! renders deterministic JSON (struct field order, non-ASCII left alone), and squeezes
//! the UTF-8 bytes through gzip. Any gzip reader on earth can undo it. That's the
//! whole correctness contract; byte-for-byte stability of the compressed output is
//! not promised.
//!
//! 🧠 Knowledge graph:
//! - `serialize`: `serde_json::to_string` over [`ChunkPayload`]
//! - `compress`: `flate2::write::GzEncoder` on the blocking pool, so a fat chunk never
//!   parks the async runtime
//! - `decompress`: the inverse, for verification and tests

use std::io::{Read, Write};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::common::{ChunkPayload, TransformedRecord};

/// 📦 Serialize a batch of records into chunk-payload JSON text.
pub(crate) fn serialize(records: Vec<TransformedRecord>) -> Result<String> {
    let the_payload = ChunkPayload { data: records };
    serde_json::to_string(&the_payload)
        .context("💀 The chunk payload refused to become JSON. serde_json had notes.")
}

/// 🫁 Gzip the UTF-8 bytes of `text`. Runs on tokio's blocking pool.
pub(crate) async fn compress(text: String) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || gzip(text.as_bytes()))
        .await
        .context("💀 The compression task vanished before it could hand back its bytes")?
}

/// 🔄 Inflate a gzip payload back into text. Handy for checking what actually landed
/// in the bucket.
pub fn decompress(bytes: &[u8]) -> Result<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .context("💀 That was not a gzip payload we could read back. Or not UTF-8 inside.")?;
    Ok(text)
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::default());
    encoder
        .write_all(bytes)
        .context("💀 gzip choked while swallowing the payload")?;
    encoder
        .finish()
        .context("💀 gzip could not write its trailer. The bytes are stuck in the throat.")
}
