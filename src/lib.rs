//! # tuplestore
//!
//! An in-memory stand-in for a binary tuple-store server, with:
//! - Byte-exact request/response framing and error codes
//! - Unique and non-unique indexes kept consistent over variable-shaped tuples
//! - The update language: SET, integer arithmetic, SPLICE, field INSERT/DELETE
//! - One-request-at-a-time execution behind a single lock
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Transport (out of crate)                     │
//! │            frames in ─────────────▶ frames out               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ protocol::codec
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (Mutex: one request at a time)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Update    │─────────▶│    Space    │
//!   │ Interpreter │          │ arena+index │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │ Tuple / Key │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tuple;
pub mod key;
pub mod space;
pub mod update;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{Config, IndexConfig, SpaceConfig};
pub use engine::Engine;
pub use protocol::{Flags, Request, Response};
pub use tuple::Tuple;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tuplestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
