//! Error types for tuplestore
//!
//! Provides a unified error type for all operations. Variants that mirror the
//! wire protocol carry the numeric code the real server reports, see
//! [`StoreError::code`].

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Wire error codes, bit-for-bit as the server reports them
pub mod codes {
    pub const ILLEGAL_PARAMS: u32 = 2;
    pub const MALFORMED_TUPLE: u32 = 25;
    pub const TYPE_MISMATCH: u32 = 40;
    pub const KEY_PART_COUNT: u32 = 47;
    pub const TUPLE_NOT_FOUND: u32 = 49;
    pub const NO_SUCH_INDEX: u32 = 53;
    pub const FIELD_NOT_FOUND: u32 = 54;
    pub const DUPLICATE_KEY: u32 = 55;
    pub const NO_SUCH_SPACE: u32 = 57;
    /// Reported for failures that have no protocol counterpart
    pub const UNKNOWN: u32 = 0;
}

/// Unified error type for tuplestore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Protocol Errors (reported to the client with a wire code)
    // -------------------------------------------------------------------------
    #[error("Illegal parameters, Unknown operation {0}")]
    UnknownOperation(u32),

    #[error("Illegal parameters, {0}")]
    IllegalParams(String),

    #[error("UPDATE error: the new tuple has no fields")]
    MalformedTuple,

    #[error("Field type does not match one required by operation: expected a {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("Key part count {got} does not match index part count {expected}")]
    KeyPartCountMismatch { got: usize, expected: usize },

    #[error("Tuple doesn't exist")]
    TupleNotFound,

    #[error("No index #{index} is defined in space {space}")]
    NoSuchIndex { space: u32, index: u32 },

    #[error("Field {0} was not found in the tuple")]
    FieldNotFound(u32),

    #[error("Duplicate key exists in a unique index")]
    DuplicateKey,

    #[error("Space {0} does not exist")]
    NoSuchSpace(u32),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Invariant Violations
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Wire code for protocol errors, `None` for everything else
    pub fn code(&self) -> Option<u32> {
        let code = match self {
            StoreError::UnknownOperation(_) | StoreError::IllegalParams(_) => codes::ILLEGAL_PARAMS,
            StoreError::MalformedTuple => codes::MALFORMED_TUPLE,
            StoreError::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            StoreError::KeyPartCountMismatch { .. } => codes::KEY_PART_COUNT,
            StoreError::TupleNotFound => codes::TUPLE_NOT_FOUND,
            StoreError::NoSuchIndex { .. } => codes::NO_SUCH_INDEX,
            StoreError::FieldNotFound(_) => codes::FIELD_NOT_FOUND,
            StoreError::DuplicateKey => codes::DUPLICATE_KEY,
            StoreError::NoSuchSpace(_) => codes::NO_SUCH_SPACE,
            StoreError::Io(_) | StoreError::Config(_) | StoreError::Internal(_) => return None,
        };
        Some(code)
    }

    /// Code written into an error response frame
    pub fn wire_code(&self) -> u32 {
        self.code().unwrap_or(codes::UNKNOWN)
    }

    /// True for request-local failures the protocol knows about
    pub fn is_protocol_error(&self) -> bool {
        self.code().is_some()
    }
}
