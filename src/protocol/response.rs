//! Response definitions
//!
//! Represents responses to clients, plus builders and parsers for the
//! select and DML body layouts.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use crate::tuple::{read_u32, Tuple};

use super::request::RequestType;

/// Response status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error { code: u32, message: String },
}

/// A response to send to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Echo of the request type
    pub request_type: u32,

    /// Echo of the request id
    pub request_id: u32,

    pub status: Status,

    /// Select or DML body; empty for PING and errors
    pub body: Bytes,
}

impl Response {
    /// Create an OK response
    pub fn ok(request_type: RequestType, request_id: u32, body: Bytes) -> Self {
        Self {
            request_type: request_type as u32,
            request_id,
            status: Status::Ok,
            body,
        }
    }

    /// Create an empty PING response
    pub fn ping(request_id: u32) -> Self {
        Self::ok(RequestType::Ping, request_id, Bytes::new())
    }

    /// Create an ERROR response carrying the wire code and message
    pub fn error(request_type: u32, request_id: u32, error: &StoreError) -> Self {
        Self {
            request_type,
            request_id,
            status: Status::Error {
                code: error.wire_code(),
                message: error.to_string(),
            },
            body: Bytes::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<u32> {
        match self.status {
            Status::Ok => None,
            Status::Error { code, .. } => Some(code),
        }
    }

    /// The `return_code` word of the response frame
    ///
    /// 0 on success, `(code << 8) | 2` on error.
    pub fn return_code(&self) -> u32 {
        match self.status {
            Status::Ok => 0,
            Status::Error { code, .. } => (code << 8) | 2,
        }
    }

    /// Leading count of a select or DML body
    pub fn affected_count(&self) -> Result<u32> {
        let mut buf = self.body.as_ref();
        read_u32(&mut buf, "affected count")
    }

    /// Tuples carried by a select body or a RETURN_TUPLE DML body
    pub fn tuples(&self) -> Result<Vec<Tuple>> {
        decode_tuples_body(&self.body)
    }
}

/// Build a select body: count, then length-prefixed packed tuples
pub fn select_body<'a, I>(tuples: I) -> Bytes
where
    I: IntoIterator<Item = &'a Tuple>,
    I::IntoIter: ExactSizeIterator,
{
    let tuples = tuples.into_iter();
    let mut out = BytesMut::new();
    out.put_u32_le(tuples.len() as u32);
    for tuple in tuples {
        put_tuple(&mut out, tuple);
    }
    out.freeze()
}

/// Build a DML body: affected count, plus the tuple when one is echoed
pub fn dml_body(affected: u32, tuple: Option<&Tuple>) -> Bytes {
    let mut out = BytesMut::new();
    out.put_u32_le(affected);
    if let Some(tuple) = tuple {
        put_tuple(&mut out, tuple);
    }
    out.freeze()
}

fn put_tuple(out: &mut BytesMut, tuple: &Tuple) {
    out.put_u32_le(tuple.packed_len() as u32);
    tuple.pack_into(out);
}

/// Parse either body layout
///
/// A DML body without an echoed tuple has a count but nothing after it, so
/// tuples are read until the body is exhausted, up to the declared count.
pub fn decode_tuples_body(body: &[u8]) -> Result<Vec<Tuple>> {
    let mut buf = body;
    let count = read_u32(&mut buf, "tuple count")? as usize;
    let mut tuples = Vec::with_capacity(count.min(buf.remaining() / 8));
    while buf.has_remaining() && tuples.len() < count {
        let len = read_u32(&mut buf, "tuple length")? as usize;
        if buf.remaining() < len {
            return Err(StoreError::IllegalParams(format!(
                "truncated tuple: expected {} bytes, got {}",
                len,
                buf.remaining()
            )));
        }
        tuples.push(Tuple::from_packed(&buf[..len])?);
        buf.advance(len);
    }
    if buf.has_remaining() {
        return Err(StoreError::IllegalParams(format!(
            "{} trailing bytes in response body",
            buf.remaining()
        )));
    }
    Ok(tuples)
}
