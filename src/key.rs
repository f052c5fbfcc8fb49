//! Key Codec
//!
//! Composite index keys built from a projection of tuple fields.
//!
//! ```text
//! ┌──────┬──────────┬──────────┬─────┬──────────┬──────┐
//! │ 0x01 │ Field f0 │ Field f1 │ ... │ Field fn │ 0x01 │
//! └──────┴──────────┴──────────┴─────┴──────────┴──────┘
//! ```
//!
//! Field bytes are concatenated without separators, so two projections collide
//! exactly when their concatenated bytes are identical. The sentinels keep the
//! empty and all-zero projections distinct from "no key".

use bytes::{BufMut, Bytes, BytesMut};

use crate::tuple::Tuple;

/// Leading and trailing key byte
pub const KEY_SENTINEL: u8 = 0x01;

/// Hashable, comparable index key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Bytes);

impl Key {
    /// Encode the listed fields of `tuple`, in list order
    ///
    /// Callers validate that every position exists; missing positions are
    /// skipped rather than panicking.
    pub fn encode(tuple: &Tuple, fields: &[u32]) -> Key {
        debug_assert!(
            fields.iter().all(|&f| (f as usize) < tuple.len()),
            "key fields {:?} exceed tuple of {} fields",
            fields,
            tuple.len()
        );
        Self::build(fields.iter().filter_map(|&f| tuple.get_bytes(f as usize)))
    }

    /// Encode every field of a key tuple
    pub fn from_parts(key: &Tuple) -> Key {
        Self::build(key.iter().map(|f| f.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn build<'a>(parts: impl Iterator<Item = &'a [u8]> + Clone) -> Key {
        let len = 2 + parts.clone().map(<[u8]>::len).sum::<usize>();
        let mut out = BytesMut::with_capacity(len);
        out.put_u8(KEY_SENTINEL);
        for part in parts {
            out.put_slice(part);
        }
        out.put_u8(KEY_SENTINEL);
        Key(out.freeze())
    }
}
