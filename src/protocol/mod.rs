//! Protocol Module
//!
//! Defines the wire protocol shared with clients of the real server.
//!
//! ## Protocol Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │ Type (4) │ Len (4)  │ Id (4)   │         Body                │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Request Types
//! - 13:     INSERT - Body: space (4) + flags (4) + tuple
//! - 17:     SELECT - Body: space (4) + index (4) + offset (4) + limit (4) + count (4) + keys
//! - 19:     UPDATE - Body: space (4) + flags (4) + key + op stream
//! - 21:     DELETE - Body: space (4) + flags (4) + key
//! - 0xFF00: PING   - Body: empty
//!
//! ### Return Codes
//! - 0: OK
//! - (code << 8) | 2: ERROR, body holds the message

mod request;
mod response;
mod codec;

pub use request::{Flags, RawRequest, Request, RequestBody, RequestType};
pub use response::{decode_tuples_body, dml_body, select_body, Response, Status};
pub use codec::{
    decode_frame, decode_request, decode_response, encode_raw_request, encode_request,
    encode_response, read_request, read_response, write_request, write_response, HEADER_SIZE,
    MAX_BODY_SIZE,
};

/// Delivers requests to an engine and carries responses back
///
/// The engine knows nothing about sockets or addressing; whatever moves frames
/// between peers only needs this entry point.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &Request) -> Response;
}
