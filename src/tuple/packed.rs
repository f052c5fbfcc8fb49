//! Packed tuple wire form
//!
//! ```text
//! ┌──────────────┬─────────┬──────────┬─────────┬──────────┬─────┐
//! │ Count (4)    │ Len (4) │ Field 0  │ Len (4) │ Field 1  │ ... │
//! └──────────────┴─────────┴──────────┴─────────┴──────────┴─────┘
//! ```
//!
//! All integers are little-endian. The same length-prefixed field layout is
//! reused by the update operation stream for its arguments.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};

use super::Tuple;

/// Bytes taken by a count or length prefix
const PREFIX_SIZE: usize = 4;

impl Tuple {
    /// Size of the packed form in bytes
    pub fn packed_len(&self) -> usize {
        PREFIX_SIZE
            + self
                .fields
                .iter()
                .map(|f| PREFIX_SIZE + f.len())
                .sum::<usize>()
    }

    /// Encode to the packed wire form
    pub fn pack(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.packed_len());
        self.pack_into(&mut out);
        out.freeze()
    }

    /// Append the packed wire form to `out`
    pub fn pack_into(&self, out: &mut BytesMut) {
        out.put_u32_le(self.fields.len() as u32);
        for field in &self.fields {
            out.put_u32_le(field.len() as u32);
            out.put_slice(field);
        }
    }

    /// Decode one packed tuple from the front of `buf`, advancing it
    pub fn unpack<B: Buf>(buf: &mut B) -> Result<Tuple> {
        let count = read_u32(buf, "tuple field count")? as usize;
        let fields = read_fields(buf, count)?;
        Ok(Tuple { fields })
    }

    /// Decode a buffer that holds exactly one packed tuple
    pub fn from_packed(bytes: &[u8]) -> Result<Tuple> {
        let mut buf = bytes;
        let tuple = Tuple::unpack(&mut buf)?;
        if buf.has_remaining() {
            return Err(StoreError::IllegalParams(format!(
                "{} trailing bytes after packed tuple",
                buf.remaining()
            )));
        }
        Ok(tuple)
    }
}

/// Read a little-endian `u32`, failing instead of panicking on short input
pub(crate) fn read_u32<B: Buf>(buf: &mut B, what: &str) -> Result<u32> {
    if buf.remaining() < PREFIX_SIZE {
        return Err(StoreError::IllegalParams(format!(
            "truncated {}: need {} bytes, got {}",
            what,
            PREFIX_SIZE,
            buf.remaining()
        )));
    }
    Ok(buf.get_u32_le())
}

/// Read one length-prefixed field
pub(crate) fn read_field<B: Buf>(buf: &mut B) -> Result<Bytes> {
    let len = read_u32(buf, "field length")? as usize;
    if buf.remaining() < len {
        return Err(StoreError::IllegalParams(format!(
            "truncated field: expected {} bytes, got {}",
            len,
            buf.remaining()
        )));
    }
    Ok(buf.copy_to_bytes(len))
}

/// Read `count` consecutive length-prefixed fields
pub(crate) fn read_fields<B: Buf>(buf: &mut B, count: usize) -> Result<Vec<Bytes>> {
    // Every field costs at least its prefix, so cap the preallocation
    let mut fields = Vec::with_capacity(count.min(buf.remaining() / PREFIX_SIZE));
    for _ in 0..count {
        fields.push(read_field(buf)?);
    }
    Ok(fields)
}
