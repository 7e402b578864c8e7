// ai
//! 🔄 Transforms: the wardrobe department of the feed 🎭
//!
//! A [`RawRecord`] walks in wearing database clothes (flat columns, floats with
//! opinions). A [`TransformedRecord`] walks out wearing the external feed's nested
//! outfit, coordinates pressed to exactly six decimal places.
//!
//! Same trick as ever: a zero-sized marker type implementing a trait, so the call
//! monomorphizes into straight-line code. No vtables were harmed.
//!
//! ## Knowledge Graph 🧠
//! - Depends on: `common::{RawRecord, TransformedRecord}`
//! - Used by: `processor::ChunkProcessor` (one call per fetched row)
//! - Pure: no I/O, no clock, no config. Same row in, same record out.

use crate::common::{Address, Location, RawRecord, TransformedRecord};

/// 🔄 Maps one raw source row into the external record shape.
///
/// Total over well-formed rows. Malformed rows never get here: a NULL column fails
/// decoding at fetch time, which fails the whole chunk.
pub(crate) trait RecordTransform {
    fn transform(row: &RawRecord) -> TransformedRecord;
}

/// 🏥 The facility feed schema: `entity_id`, `telephone`, and a nested `location`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FacilityFeed;

impl RecordTransform for FacilityFeed {
    #[inline]
    fn transform(row: &RawRecord) -> TransformedRecord {
        TransformedRecord {
            entity_id: row.id.to_string(),
            name: row.name.clone(),
            telephone: row.phone.clone(),
            url: row.url.clone(),
            location: Location {
                latitude: fixed_six(row.latitude),
                longitude: fixed_six(row.longitude),
                address: Address {
                    country: row.country.clone(),
                    locality: row.locality.clone(),
                    region: row.region.clone(),
                    postal_code: row.postal_code.clone(),
                    street_address: row.street_address.clone(),
                },
            },
        }
    }
}

/// 📐 Fixed-point, six digits after the dot. `40.7128951` → `"40.712895"`.
fn fixed_six(coordinate: f64) -> String {
    format!("{coordinate:.6}")
}
