//! Index
//!
//! Maps the key of a field projection to the rows sharing it.
//!
//! Buckets keep insertion order: the first row put under a key is the first
//! one returned. A unique index never holds more than one row per bucket.

use std::collections::HashMap;

use crate::error::{Result, StoreError};
use crate::key::Key;
use crate::tuple::Tuple;

use super::arena::TupleId;

/// One index of a space
#[derive(Debug, Clone)]
pub struct Index {
    fields: Vec<u32>,
    unique: bool,
    map: HashMap<Key, Vec<TupleId>>,
}

impl Index {
    pub fn new(fields: impl Into<Vec<u32>>, unique: bool) -> Self {
        Self {
            fields: fields.into(),
            unique,
            map: HashMap::new(),
        }
    }

    /// Field positions read by this index, in key order
    pub fn fields(&self) -> &[u32] {
        &self.fields
    }

    pub fn part_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Key of a full stored tuple under this index
    pub fn key_of(&self, tuple: &Tuple) -> Key {
        Key::encode(tuple, &self.fields)
    }

    /// True if the tuple has every field this index reads
    pub fn covers(&self, tuple: &Tuple) -> bool {
        self.fields.iter().all(|&f| (f as usize) < tuple.len())
    }

    /// First field position the tuple lacks, if any
    pub fn missing_field(&self, tuple: &Tuple) -> Option<u32> {
        self.fields.iter().copied().find(|&f| (f as usize) >= tuple.len())
    }

    /// Add a row under its key
    pub fn put(&mut self, tuple: &Tuple, id: TupleId) -> Result<()> {
        let key = self.key_of(tuple);
        let bucket = self.map.entry(key).or_default();
        if self.unique && !bucket.is_empty() {
            return Err(StoreError::DuplicateKey);
        }
        bucket.push(id);
        Ok(())
    }

    /// Rows stored under `key`, oldest first; empty if none
    pub fn lookup(&self, key: &Key) -> &[TupleId] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lookup_one(&self, key: &Key) -> Option<TupleId> {
        self.lookup(key).first().copied()
    }

    /// Drop a row from the bucket its current values map to
    ///
    /// Silently does nothing if the row is not there.
    pub fn remove(&mut self, tuple: &Tuple, id: TupleId) {
        let key = self.key_of(tuple);
        if let Some(bucket) = self.map.get_mut(&key) {
            bucket.retain(|&other| other != id);
            if bucket.is_empty() {
                self.map.remove(&key);
            }
        }
    }

    /// Would putting `tuple` violate uniqueness, not counting row `ignoring`?
    pub fn would_conflict(&self, tuple: &Tuple, ignoring: Option<TupleId>) -> bool {
        self.unique
            && self
                .lookup(&self.key_of(tuple))
                .iter()
                .any(|&id| Some(id) != ignoring)
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Number of rows across all buckets
    pub fn entry_count(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }
}
