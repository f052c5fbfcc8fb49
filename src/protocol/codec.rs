//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────────────────┐
//! │ Type (4) │ Len (4)  │ Id (4)   │         Body                │
//! └──────────┴──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────────┬──────────────┐
//! │ Type (4) │ Len (4)  │ Id (4)   │ RetCode (4)  │    Body      │
//! └──────────┴──────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! PING responses have no return code and no body. `Len` counts every byte
//! after the header, return code included. Error responses carry the
//! message text as body.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use super::{RawRequest, Request, RequestType, Response, Status};

/// Header size: type (4) + body length (4) + request id (4)
pub const HEADER_SIZE: usize = 12;

/// Default maximum body size (16 MB)
pub const MAX_BODY_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the return code word in non-PING responses
const RETURN_CODE_SIZE: usize = 4;

/// Low byte of an error return code
const STATUS_ERROR: u32 = 2;

struct Header {
    request_type: u32,
    body_len: usize,
    request_id: u32,
}

fn parse_header(mut bytes: &[u8], max_body: u32) -> Result<Header> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::IllegalParams(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let request_type = bytes.get_u32_le();
    let body_len = bytes.get_u32_le();
    let request_id = bytes.get_u32_le();

    if body_len > max_body {
        return Err(StoreError::IllegalParams(format!(
            "Body too large: {} bytes (max {})",
            body_len, max_body
        )));
    }

    Ok(Header {
        request_type,
        body_len: body_len as usize,
        request_id,
    })
}

fn put_header(out: &mut BytesMut, request_type: u32, body_len: usize, request_id: u32) {
    out.put_u32_le(request_type);
    out.put_u32_le(body_len as u32);
    out.put_u32_le(request_id);
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to a complete frame
pub fn encode_request(request: &Request) -> Bytes {
    encode_raw_request(&request.to_raw())
}

/// Encode an undecoded request frame
pub fn encode_raw_request(raw: &RawRequest) -> Bytes {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + raw.body.len());
    put_header(&mut message, raw.request_type, raw.body.len(), raw.request_id);
    message.put_slice(&raw.body);
    message.freeze()
}

/// Split a frame into header fields and body without interpreting the body
pub fn decode_frame(bytes: &[u8], max_body: u32) -> Result<RawRequest> {
    let header = parse_header(bytes, max_body)?;

    let total_len = HEADER_SIZE + header.body_len;
    if bytes.len() < total_len {
        return Err(StoreError::IllegalParams(format!(
            "Incomplete body: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok(RawRequest {
        request_type: header.request_type,
        request_id: header.request_id,
        body: Bytes::copy_from_slice(&bytes[HEADER_SIZE..total_len]),
    })
}

/// Decode a request frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let raw = decode_frame(bytes, MAX_BODY_SIZE)?;
    Request::try_from(&raw)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to a complete frame
pub fn encode_response(response: &Response) -> Bytes {
    if response.request_type == RequestType::Ping as u32 && response.is_ok() {
        let mut message = BytesMut::with_capacity(HEADER_SIZE);
        put_header(&mut message, response.request_type, 0, response.request_id);
        return message.freeze();
    }

    let payload: &[u8] = match &response.status {
        Status::Ok => &response.body,
        Status::Error { message, .. } => message.as_bytes(),
    };

    let body_len = RETURN_CODE_SIZE + payload.len();
    let mut message = BytesMut::with_capacity(HEADER_SIZE + body_len);
    put_header(&mut message, response.request_type, body_len, response.request_id);
    message.put_u32_le(response.return_code());
    message.put_slice(payload);
    message.freeze()
}

/// Decode a response frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let header = parse_header(bytes, MAX_BODY_SIZE)?;

    let total_len = HEADER_SIZE + header.body_len;
    if bytes.len() < total_len {
        return Err(StoreError::IllegalParams(format!(
            "Incomplete response body: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }
    let mut body = &bytes[HEADER_SIZE..total_len];

    if header.request_type == RequestType::Ping as u32 && body.is_empty() {
        return Ok(Response::ping(header.request_id));
    }

    if body.len() < RETURN_CODE_SIZE {
        return Err(StoreError::IllegalParams(
            "Response body is missing its return code".to_string(),
        ));
    }
    let return_code = body.get_u32_le();

    let (status, body) = if return_code == 0 {
        (Status::Ok, Bytes::copy_from_slice(body))
    } else if return_code & 0xFF == STATUS_ERROR {
        let message = String::from_utf8_lossy(body).into_owned();
        (
            Status::Error {
                code: return_code >> 8,
                message,
            },
            Bytes::new(),
        )
    } else {
        return Err(StoreError::IllegalParams(format!(
            "Unknown response return code: 0x{:08x}",
            return_code
        )));
    };

    Ok(Response {
        request_type: header.request_type,
        request_id: header.request_id,
        status,
        body,
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read the header and body of one frame from a stream
fn read_frame<R: Read>(reader: &mut R, max_body: u32) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let body_len = parse_header(&header, max_body)?.body_len;

    // Read body
    let mut message = vec![0u8; HEADER_SIZE + body_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if body_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

/// Read one request frame from a stream without decoding its body
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R, max_body: u32) -> Result<RawRequest> {
    let message = read_frame(reader, max_body)?;
    decode_frame(&message, max_body)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, MAX_BODY_SIZE)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
