//! Space Module
//!
//! A tuple arena plus the indexes built over it.
//!
//! ## Responsibilities
//! - Keep every stored row in every index ("all-or-nothing" indexing)
//! - Validate field coverage and uniqueness before touching any index
//! - Replace rows space-wide instead of mutating aliases
//! - Backfill secondary indexes registered after rows exist
//!
//! Index 0 is the primary index and is always unique.

mod arena;
mod index;

pub use arena::{TupleArena, TupleId};
pub use index::Index;

use std::collections::BTreeMap;

use crate::error::{Result, StoreError};
use crate::key::Key;
use crate::tuple::Tuple;

/// Id of the primary index
pub const PRIMARY_INDEX: u32 = 0;

/// A collection of rows and its indexes
pub struct Space {
    id: u32,
    rows: TupleArena,
    indexes: BTreeMap<u32, Index>,
}

impl Space {
    /// Create an empty space; an empty field list keys the primary on field 0
    pub fn new(id: u32, primary_fields: &[u32]) -> Self {
        let fields = if primary_fields.is_empty() {
            vec![0]
        } else {
            primary_fields.to_vec()
        };
        let mut indexes = BTreeMap::new();
        indexes.insert(PRIMARY_INDEX, Index::new(fields, true));

        Self {
            id,
            rows: TupleArena::new(),
            indexes,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self, id: u32) -> Option<&Index> {
        self.indexes.get(&id)
    }

    pub fn index_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.indexes.keys().copied()
    }

    pub fn primary(&self) -> Result<&Index> {
        self.indexes.get(&PRIMARY_INDEX).ok_or_else(|| {
            StoreError::Internal(format!("space {} has no primary index", self.id))
        })
    }

    pub fn get(&self, id: TupleId) -> Option<&Tuple> {
        self.rows.get(id)
    }

    /// Rows in insertion order
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.rows.iter_in_insertion_order().map(|(_, t)| t)
    }

    // =========================================================================
    // Primary Key Access
    // =========================================================================

    /// Project a full tuple onto the primary index fields
    pub fn primary_key_of(&self, tuple: &Tuple) -> Result<Tuple> {
        tuple.project(self.primary()?.fields())
    }

    /// Row id for a primary key tuple
    pub fn find(&self, key: &Tuple) -> Option<TupleId> {
        self.indexes
            .get(&PRIMARY_INDEX)?
            .lookup_one(&Key::from_parts(key))
    }

    pub fn get_by_primary_key(&self, key: &Tuple) -> Option<&Tuple> {
        self.find(key).and_then(|id| self.rows.get(id))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Check that `tuple` could be stored, treating row `replacing` as gone
    ///
    /// Every index must find its fields in the tuple and no unique index may
    /// already hold a different row under the tuple's key.
    pub fn check_insert(&self, tuple: &Tuple, replacing: Option<TupleId>) -> Result<()> {
        for index in self.indexes.values() {
            if let Some(field) = index.missing_field(tuple) {
                return Err(StoreError::FieldNotFound(field));
            }
        }
        if self
            .indexes
            .values()
            .any(|index| index.would_conflict(tuple, replacing))
        {
            return Err(StoreError::DuplicateKey);
        }
        Ok(())
    }

    /// Validation half of [`Space::replace`]
    pub fn check_replace(&self, id: TupleId, tuple: &Tuple) -> Result<()> {
        self.check_insert(tuple, Some(id))
    }

    /// Store a new row in every index, or in none
    pub fn insert_everywhere(&mut self, tuple: Tuple) -> Result<TupleId> {
        self.check_insert(&tuple, None)?;
        self.link(tuple)
    }

    /// Remove a row from every index and free its slot
    pub fn remove_everywhere(&mut self, id: TupleId) -> Option<Tuple> {
        let tuple = self.rows.take(id)?;
        for index in self.indexes.values_mut() {
            index.remove(&tuple, id);
        }
        Some(tuple)
    }

    /// Swap row `id` for `tuple` across every index
    ///
    /// Validation runs first; on failure the old row stays untouched.
    pub fn replace(&mut self, id: TupleId, tuple: Tuple) -> Result<TupleId> {
        if self.rows.get(id).is_none() {
            return Err(StoreError::Internal(format!(
                "space {}: replace of missing row {:?}",
                self.id, id
            )));
        }
        self.check_replace(id, &tuple)?;
        self.remove_everywhere(id);
        self.link(tuple)
    }

    /// Put an already validated row into the arena and every index
    fn link(&mut self, tuple: Tuple) -> Result<TupleId> {
        let id = self.rows.insert(tuple);
        let Some(stored) = self.rows.get(id) else {
            return Err(StoreError::Internal(format!(
                "space {}: row {:?} vanished after insert",
                self.id, id
            )));
        };
        for (index_id, index) in self.indexes.iter_mut() {
            index.put(stored, id).map_err(|e| {
                StoreError::Internal(format!(
                    "space {}: index {} rejected a validated row: {}",
                    self.id, index_id, e
                ))
            })?;
        }
        Ok(id)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Rows matching a key tuple on the given index, oldest first
    pub fn select(&self, index_id: u32, key: &Tuple) -> Result<Vec<&Tuple>> {
        let index = self.indexes.get(&index_id).ok_or(StoreError::NoSuchIndex {
            space: self.id,
            index: index_id,
        })?;
        if key.len() != index.part_count() {
            return Err(StoreError::KeyPartCountMismatch {
                got: key.len(),
                expected: index.part_count(),
            });
        }

        index
            .lookup(&Key::from_parts(key))
            .iter()
            .map(|&id| {
                self.rows.get(id).ok_or_else(|| {
                    StoreError::Internal(format!(
                        "space {}: index {} points at freed row {:?}",
                        self.id, index_id, id
                    ))
                })
            })
            .collect()
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Register a secondary index and backfill it from existing rows
    ///
    /// Re-registering an id keeps the first declaration. If backfill breaks
    /// uniqueness or a row lacks an indexed field, nothing is registered.
    pub fn add_index(&mut self, id: u32, fields: &[u32], unique: bool) -> Result<()> {
        if self.indexes.contains_key(&id) {
            return Ok(());
        }
        if fields.is_empty() {
            return Err(StoreError::Config(format!(
                "space {}: index {} has no fields",
                self.id, id
            )));
        }

        let mut index = Index::new(fields, unique);
        for (row, tuple) in self.rows.iter_in_insertion_order() {
            if let Some(field) = index.missing_field(tuple) {
                return Err(StoreError::FieldNotFound(field));
            }
            index.put(tuple, row)?;
        }

        tracing::info!(
            space = self.id,
            index = id,
            unique,
            backfilled = index.entry_count(),
            "index registered"
        );
        self.indexes.insert(id, index);
        Ok(())
    }
}
