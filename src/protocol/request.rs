//! Request definitions
//!
//! Represents requests from clients, plus the body codec for each type.

use std::ops::BitOr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use crate::tuple::{read_u32, Tuple};
use crate::update::{OpStream, UpdateOp};

/// Request types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestType {
    Insert = 13,
    Select = 17,
    Update = 19,
    Delete = 21,
    Ping = 0xFF00,
}

impl TryFrom<u32> for RequestType {
    type Error = StoreError;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            13 => Ok(RequestType::Insert),
            17 => Ok(RequestType::Select),
            19 => Ok(RequestType::Update),
            21 => Ok(RequestType::Delete),
            0xFF00 => Ok(RequestType::Ping),
            other => Err(StoreError::UnknownOperation(other)),
        }
    }
}

/// DML request flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Echo the affected tuple in the response
    pub const RETURN_TUPLE: Flags = Flags(0x01);
    /// Insert must create a new row
    pub const ADD_TUPLE: Flags = Flags(0x02);
    /// Insert must replace an existing row
    pub const REPLACE_TUPLE: Flags = Flags(0x04);

    pub fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// A parsed request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Health check
    Ping,

    /// Store a tuple
    Insert { space: u32, flags: Flags, tuple: Tuple },

    /// Look up rows by one or more keys of an index
    Select {
        space: u32,
        index: u32,
        offset: u32,
        limit: u32,
        keys: Vec<Tuple>,
    },

    /// Apply field operations to the row with the given primary key
    ///
    /// The operation stream stays encoded until the row is found.
    Update {
        space: u32,
        flags: Flags,
        key: Tuple,
        ops: OpStream,
    },

    /// Remove the row with the given primary key
    Delete { space: u32, flags: Flags, key: Tuple },
}

/// A request with its correlation id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: u32,
    pub body: RequestBody,
}

/// An undecoded request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub request_type: u32,
    pub request_id: u32,
    pub body: Bytes,
}

impl Request {
    pub fn ping(id: u32) -> Self {
        Self {
            id,
            body: RequestBody::Ping,
        }
    }

    pub fn insert(id: u32, space: u32, flags: Flags, tuple: Tuple) -> Self {
        Self {
            id,
            body: RequestBody::Insert { space, flags, tuple },
        }
    }

    pub fn select(
        id: u32,
        space: u32,
        index: u32,
        keys: Vec<Tuple>,
        offset: u32,
        limit: u32,
    ) -> Self {
        Self {
            id,
            body: RequestBody::Select {
                space,
                index,
                offset,
                limit,
                keys,
            },
        }
    }

    pub fn update(id: u32, space: u32, flags: Flags, key: Tuple, ops: Vec<UpdateOp>) -> Self {
        Self::update_stream(id, space, flags, key, OpStream::from(ops))
    }

    /// UPDATE carrying an already encoded operation stream
    pub fn update_stream(id: u32, space: u32, flags: Flags, key: Tuple, ops: OpStream) -> Self {
        Self {
            id,
            body: RequestBody::Update {
                space,
                flags,
                key,
                ops,
            },
        }
    }

    pub fn delete(id: u32, space: u32, flags: Flags, key: Tuple) -> Self {
        Self {
            id,
            body: RequestBody::Delete { space, flags, key },
        }
    }

    /// Get the request type
    pub fn request_type(&self) -> RequestType {
        match self.body {
            RequestBody::Ping => RequestType::Ping,
            RequestBody::Insert { .. } => RequestType::Insert,
            RequestBody::Select { .. } => RequestType::Select,
            RequestBody::Update { .. } => RequestType::Update,
            RequestBody::Delete { .. } => RequestType::Delete,
        }
    }

    /// Encode just the body, without the frame header
    pub fn encode_body(&self) -> Bytes {
        let mut out = BytesMut::new();
        match &self.body {
            RequestBody::Ping => {}
            RequestBody::Insert { space, flags, tuple } => {
                out.put_u32_le(*space);
                out.put_u32_le(flags.bits());
                tuple.pack_into(&mut out);
            }
            RequestBody::Select {
                space,
                index,
                offset,
                limit,
                keys,
            } => {
                out.put_u32_le(*space);
                out.put_u32_le(*index);
                out.put_u32_le(*offset);
                out.put_u32_le(*limit);
                out.put_u32_le(keys.len() as u32);
                for key in keys {
                    key.pack_into(&mut out);
                }
            }
            RequestBody::Update {
                space,
                flags,
                key,
                ops,
            } => {
                out.put_u32_le(*space);
                out.put_u32_le(flags.bits());
                key.pack_into(&mut out);
                out.put_slice(ops.as_bytes());
            }
            RequestBody::Delete { space, flags, key } => {
                out.put_u32_le(*space);
                out.put_u32_le(flags.bits());
                key.pack_into(&mut out);
            }
        }
        out.freeze()
    }

    /// Wrap the encoded body in an undecoded frame
    pub fn to_raw(&self) -> RawRequest {
        RawRequest {
            request_type: self.request_type() as u32,
            request_id: self.id,
            body: self.encode_body(),
        }
    }
}

impl TryFrom<&RawRequest> for Request {
    type Error = StoreError;

    fn try_from(raw: &RawRequest) -> Result<Self> {
        let mut buf = raw.body.clone();
        let body = match RequestType::try_from(raw.request_type)? {
            RequestType::Ping => RequestBody::Ping,
            RequestType::Insert => RequestBody::Insert {
                space: read_u32(&mut buf, "space")?,
                flags: Flags::from_bits(read_u32(&mut buf, "flags")?),
                tuple: Tuple::unpack(&mut buf)?,
            },
            RequestType::Select => {
                let space = read_u32(&mut buf, "space")?;
                let index = read_u32(&mut buf, "index")?;
                let offset = read_u32(&mut buf, "offset")?;
                let limit = read_u32(&mut buf, "limit")?;
                let count = read_u32(&mut buf, "key count")? as usize;
                let mut keys = Vec::with_capacity(count.min(buf.remaining() / 4));
                for _ in 0..count {
                    keys.push(Tuple::unpack(&mut buf)?);
                }
                RequestBody::Select {
                    space,
                    index,
                    offset,
                    limit,
                    keys,
                }
            }
            RequestType::Update => RequestBody::Update {
                space: read_u32(&mut buf, "space")?,
                flags: Flags::from_bits(read_u32(&mut buf, "flags")?),
                key: Tuple::unpack(&mut buf)?,
                ops: OpStream::from_bytes(buf.split_to(buf.remaining())),
            },
            RequestType::Delete => RequestBody::Delete {
                space: read_u32(&mut buf, "space")?,
                flags: Flags::from_bits(read_u32(&mut buf, "flags")?),
                key: Tuple::unpack(&mut buf)?,
            },
        };

        if buf.has_remaining() {
            return Err(StoreError::IllegalParams(format!(
                "{} trailing bytes in request body",
                buf.remaining()
            )));
        }

        Ok(Request {
            id: raw.request_id,
            body,
        })
    }
}
