//! Configuration for tuplestore
//!
//! Centralized configuration with sensible defaults. Spaces and their indexes
//! are declared here and created when the engine opens.

use std::collections::HashSet;

use crate::error::{Result, StoreError};

/// Main configuration for a tuplestore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Schema Configuration
    // -------------------------------------------------------------------------
    /// Spaces created by `Engine::open`
    pub spaces: Vec<SpaceConfig>,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Largest request/response body accepted by the frame codec (in bytes)
    pub max_body_size: u32,
}

/// Declaration of a single space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceConfig {
    /// Space number used by requests
    pub id: u32,

    /// Field positions of the primary index (index 0, always unique)
    pub primary: Vec<u32>,

    /// Secondary indexes, registered in declaration order
    pub secondary: Vec<IndexConfig>,
}

/// Declaration of a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub id: u32,
    pub unique: bool,
    pub fields: Vec<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spaces: Vec::new(),
            max_body_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the declarations for conflicts before any space is built
    pub fn validate(&self) -> Result<()> {
        let mut space_ids = HashSet::new();
        for space in &self.spaces {
            if !space_ids.insert(space.id) {
                return Err(StoreError::Config(format!("space {} declared twice", space.id)));
            }
            if space.primary.is_empty() {
                return Err(StoreError::Config(format!(
                    "space {}: primary index has no fields",
                    space.id
                )));
            }

            let mut index_ids = HashSet::from([0u32]);
            for index in &space.secondary {
                if !index_ids.insert(index.id) {
                    return Err(StoreError::Config(format!(
                        "space {}: index {} declared twice (index 0 is the primary)",
                        space.id, index.id
                    )));
                }
                if index.fields.is_empty() {
                    return Err(StoreError::Config(format!(
                        "space {}: index {} has no fields",
                        space.id, index.id
                    )));
                }
            }
        }

        if self.max_body_size == 0 {
            return Err(StoreError::Config("max_body_size must be positive".to_string()));
        }

        Ok(())
    }
}

impl SpaceConfig {
    /// Declare a space with the given primary key fields
    ///
    /// An empty field list falls back to `[0]`.
    pub fn new(id: u32, primary: impl Into<Vec<u32>>) -> Self {
        let mut primary = primary.into();
        if primary.is_empty() {
            primary.push(0);
        }
        Self {
            id,
            primary,
            secondary: Vec::new(),
        }
    }

    /// Add a secondary index
    pub fn secondary(mut self, id: u32, unique: bool, fields: impl Into<Vec<u32>>) -> Self {
        self.secondary.push(IndexConfig {
            id,
            unique,
            fields: fields.into(),
        });
        self
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Declare a space
    pub fn space(mut self, space: SpaceConfig) -> Self {
        self.config.spaces.push(space);
        self
    }

    /// Set the largest accepted frame body (in bytes)
    pub fn max_body_size(mut self, size: u32) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
