// ai
//! 📦 Common data structures: the building blocks of chunkfeed
//!
//! 🎬 COLD OPEN: INT. DATABASE - 3:47 AM
//!
//! A row sits in the `facility` table. It has an id, a phone number, and a pair of
//! coordinates with more decimal places than anyone asked for. It does not know it is
//! about to be fetched, reshaped, gzipped, and thrown into a bucket. Nobody told it.
//! Nobody tells rows anything.
//!
//! This module defines the two shapes a facility takes on its way out of the
//! database: the [`RawRecord`] as it lives in the table, and the
//! [`TransformedRecord`] as the external feed expects it. 🦆

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 📥 One row, straight out of the source table. Immutable once fetched.
///
/// Every field is required. A NULL in any column fails the decode, which fails the
/// chunk that fetched it. No row gets to sneak into the feed half-dressed.
#[derive(Debug, Clone, PartialEq, Deserialize, sqlx::FromRow)]
pub struct RawRecord {
    /// 🔑 Primary key. The cursor walks along this column and nothing else.
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub locality: String,
    pub region: String,
    pub postal_code: String,
    pub street_address: String,
}

/// 📤 One facility, dressed for the external feed.
///
/// Field order here IS the key order on the wire. serde serializes struct fields in
/// declaration order, so reordering these is a breaking change to the feed. Don't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub entity_id: String,
    pub name: String,
    pub telephone: String,
    pub url: String,
    pub location: Location,
}

/// 📍 Where the facility is. Coordinates travel as fixed-point strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: String,
    pub longitude: String,
    pub address: Address,
}

/// 🏠 The postal half of a [`Location`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub country: String,
    pub locality: String,
    pub region: String,
    pub postal_code: String,
    pub street_address: String,
}

/// 📦 The body of one chunk file: `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub data: Vec<TransformedRecord>,
}

/// ⏱️ Seconds since the Unix epoch, right now.
///
/// A clock before 1970 yields 0 instead of a panic. If your clock is before 1970 the
/// file names are the least of your problems.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
