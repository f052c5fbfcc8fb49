//! Tuple Module
//!
//! An ordered sequence of opaque byte fields.
//!
//! ## Responsibilities
//! - Positional field access as raw bytes, `i32` or `i64` (little-endian)
//! - In-place value mutation of existing fields
//! - Shape changes (field insert/delete) by building a new tuple
//! - Packed wire form (see [`packed`])
//!
//! Fields are [`Bytes`], so cloning a tuple only bumps reference counts.

mod packed;

pub(crate) use packed::{read_field, read_fields, read_u32};

use bytes::Bytes;

use crate::error::{Result, StoreError};

/// A row or request key: positional byte fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tuple {
    fields: Vec<Bytes>,
}

impl Tuple {
    /// Create an empty tuple
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tuple from anything convertible into byte fields
    pub fn from_fields<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a raw field
    pub fn with_field(mut self, value: impl Into<Bytes>) -> Self {
        self.fields.push(value.into());
        self
    }

    /// Append a 4-byte little-endian integer field
    pub fn with_i32(self, value: i32) -> Self {
        self.with_field(Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    /// Append an 8-byte little-endian integer field
    pub fn with_i64(self, value: i64) -> Self {
        self.with_field(Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Bytes] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Bytes> {
        self.fields.get(index)
    }

    pub fn get_bytes(&self, index: usize) -> Option<&[u8]> {
        self.fields.get(index).map(|f| f.as_ref())
    }

    /// Read a field as `i32`; `None` if absent or not exactly 4 bytes
    pub fn get_i32(&self, index: usize) -> Option<i32> {
        let bytes: [u8; 4] = self.get_bytes(index)?.try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }

    /// Read a field as `i64`; `None` if absent or not exactly 8 bytes
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        let bytes: [u8; 8] = self.get_bytes(index)?.try_into().ok()?;
        Some(i64::from_le_bytes(bytes))
    }

    /// Overwrite an existing field
    pub fn set_bytes(&mut self, index: usize, value: impl Into<Bytes>) -> Result<()> {
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(StoreError::FieldNotFound(index as u32))?;
        *slot = value.into();
        Ok(())
    }

    pub fn set_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_bytes(index, Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    pub fn set_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_bytes(index, Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    /// New tuple with `value` inserted before position `index`
    ///
    /// `index == len()` appends.
    pub fn insert_field(&self, index: usize, value: impl Into<Bytes>) -> Result<Tuple> {
        if index > self.fields.len() {
            return Err(StoreError::FieldNotFound(index as u32));
        }
        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        fields.extend_from_slice(&self.fields[..index]);
        fields.push(value.into());
        fields.extend_from_slice(&self.fields[index..]);
        Ok(Tuple { fields })
    }

    /// New tuple without the field at `index`; later fields shift down
    pub fn remove_field(&self, index: usize) -> Result<Tuple> {
        if index >= self.fields.len() {
            return Err(StoreError::FieldNotFound(index as u32));
        }
        let mut fields = self.fields.clone();
        fields.remove(index);
        Ok(Tuple { fields })
    }

    /// Copy the listed positions, in list order, into a new tuple
    ///
    /// Fails with `FieldNotFound` naming the first missing position.
    pub fn project(&self, positions: &[u32]) -> Result<Tuple> {
        let fields = positions
            .iter()
            .map(|&p| {
                self.fields
                    .get(p as usize)
                    .cloned()
                    .ok_or(StoreError::FieldNotFound(p))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple { fields })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.fields.iter()
    }
}

impl<F: Into<Bytes>> FromIterator<F> for Tuple {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Tuple::from_fields(iter)
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Bytes;
    type IntoIter = std::slice::Iter<'a, Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
