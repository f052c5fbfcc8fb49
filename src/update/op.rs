//! Update operation definitions and stream codec
//!
//! ## Stream Format
//! ```text
//! ┌───────────┬──────────────┬────────────┬──────────────┬─────┐
//! │ Count (4) │ Field No (4) │ Opcode (1) │ Args         │ ... │
//! └───────────┴──────────────┴────────────┴──────────────┴─────┘
//! ```
//!
//! Args by opcode arity:
//! - 0: nothing
//! - 1: one length-prefixed field
//! - N: one length-prefixed field whose bytes hold N length-prefixed sub-fields

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use crate::tuple::{read_field, read_fields, read_u32};

/// Opcode byte of an update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateOpcode {
    Set = 0,
    Add = 1,
    And = 2,
    Xor = 3,
    Or = 4,
    Splice = 5,
    Delete = 6,
    Insert = 7,
    Sub = 8,
    Max = 9,
}

impl UpdateOpcode {
    /// Number of logical arguments the opcode carries
    pub fn arg_count(self) -> usize {
        match self {
            UpdateOpcode::Delete => 0,
            UpdateOpcode::Splice => 3,
            UpdateOpcode::Set
            | UpdateOpcode::Add
            | UpdateOpcode::And
            | UpdateOpcode::Xor
            | UpdateOpcode::Or
            | UpdateOpcode::Insert
            | UpdateOpcode::Sub
            | UpdateOpcode::Max => 1,
        }
    }
}

impl TryFrom<u8> for UpdateOpcode {
    type Error = StoreError;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => UpdateOpcode::Set,
            1 => UpdateOpcode::Add,
            2 => UpdateOpcode::And,
            3 => UpdateOpcode::Xor,
            4 => UpdateOpcode::Or,
            5 => UpdateOpcode::Splice,
            6 => UpdateOpcode::Delete,
            7 => UpdateOpcode::Insert,
            8 => UpdateOpcode::Sub,
            9 => UpdateOpcode::Max,
            other => {
                return Err(StoreError::IllegalParams(format!(
                    "unknown update operation 0x{:02x}",
                    other
                )))
            }
        })
    }
}

/// Integer combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Max,
}

impl ArithOp {
    pub fn opcode(self) -> UpdateOpcode {
        match self {
            ArithOp::Add => UpdateOpcode::Add,
            ArithOp::Sub => UpdateOpcode::Sub,
            ArithOp::And => UpdateOpcode::And,
            ArithOp::Or => UpdateOpcode::Or,
            ArithOp::Xor => UpdateOpcode::Xor,
            ArithOp::Max => UpdateOpcode::Max,
        }
    }

    pub(crate) fn apply_i32(self, value: i32, arg: i32) -> i32 {
        match self {
            ArithOp::Add => value.wrapping_add(arg),
            ArithOp::Sub => value.wrapping_sub(arg),
            ArithOp::And => value & arg,
            ArithOp::Or => value | arg,
            ArithOp::Xor => value ^ arg,
            ArithOp::Max => value.max(arg),
        }
    }

    pub(crate) fn apply_i64(self, value: i64, arg: i64) -> i64 {
        match self {
            ArithOp::Add => value.wrapping_add(arg),
            ArithOp::Sub => value.wrapping_sub(arg),
            ArithOp::And => value & arg,
            ArithOp::Or => value | arg,
            ArithOp::Xor => value ^ arg,
            ArithOp::Max => value.max(arg),
        }
    }
}

/// One decoded field operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    /// Replace the field verbatim
    Set { field: u32, value: Bytes },

    /// Combine a 4- or 8-byte integer field with `arg`
    Arith { field: u32, op: ArithOp, arg: Bytes },

    /// Remove the field, shifting later ones down
    Delete { field: u32 },

    /// Insert a new field before `field`
    Insert { field: u32, value: Bytes },

    /// Replace a byte range of the field
    Splice {
        field: u32,
        offset: i32,
        length: i32,
        insertion: Bytes,
    },
}

impl UpdateOp {
    pub fn set(field: u32, value: impl Into<Bytes>) -> Self {
        UpdateOp::Set {
            field,
            value: value.into(),
        }
    }

    pub fn arith_i32(field: u32, op: ArithOp, arg: i32) -> Self {
        UpdateOp::Arith {
            field,
            op,
            arg: Bytes::copy_from_slice(&arg.to_le_bytes()),
        }
    }

    pub fn arith_i64(field: u32, op: ArithOp, arg: i64) -> Self {
        UpdateOp::Arith {
            field,
            op,
            arg: Bytes::copy_from_slice(&arg.to_le_bytes()),
        }
    }

    pub fn delete(field: u32) -> Self {
        UpdateOp::Delete { field }
    }

    pub fn insert(field: u32, value: impl Into<Bytes>) -> Self {
        UpdateOp::Insert {
            field,
            value: value.into(),
        }
    }

    pub fn splice(field: u32, offset: i32, length: i32, insertion: impl Into<Bytes>) -> Self {
        UpdateOp::Splice {
            field,
            offset,
            length,
            insertion: insertion.into(),
        }
    }

    pub fn field(&self) -> u32 {
        match self {
            UpdateOp::Set { field, .. }
            | UpdateOp::Arith { field, .. }
            | UpdateOp::Delete { field }
            | UpdateOp::Insert { field, .. }
            | UpdateOp::Splice { field, .. } => *field,
        }
    }

    pub fn opcode(&self) -> UpdateOpcode {
        match self {
            UpdateOp::Set { .. } => UpdateOpcode::Set,
            UpdateOp::Arith { op, .. } => op.opcode(),
            UpdateOp::Delete { .. } => UpdateOpcode::Delete,
            UpdateOp::Insert { .. } => UpdateOpcode::Insert,
            UpdateOp::Splice { .. } => UpdateOpcode::Splice,
        }
    }

    /// Decode one operation record from the front of `buf`
    pub fn decode<B: Buf>(buf: &mut B) -> Result<UpdateOp> {
        let field = read_u32(buf, "update field number")?;
        if !buf.has_remaining() {
            return Err(StoreError::IllegalParams(
                "truncated update: missing opcode".to_string(),
            ));
        }
        let opcode = UpdateOpcode::try_from(buf.get_u8())?;

        let mut args = match opcode.arg_count() {
            0 => Vec::new(),
            1 => vec![read_field(buf)?],
            n => {
                let mut nested = read_field(buf)?;
                read_fields(&mut nested, n)?
            }
        }
        .into_iter();
        let mut next_arg = || {
            args.next().ok_or_else(|| {
                StoreError::IllegalParams(format!("update {:?}: missing argument", opcode))
            })
        };

        Ok(match opcode {
            UpdateOpcode::Set => UpdateOp::Set {
                field,
                value: next_arg()?,
            },
            UpdateOpcode::Add => arith(field, ArithOp::Add, next_arg()?),
            UpdateOpcode::Sub => arith(field, ArithOp::Sub, next_arg()?),
            UpdateOpcode::And => arith(field, ArithOp::And, next_arg()?),
            UpdateOpcode::Or => arith(field, ArithOp::Or, next_arg()?),
            UpdateOpcode::Xor => arith(field, ArithOp::Xor, next_arg()?),
            UpdateOpcode::Max => arith(field, ArithOp::Max, next_arg()?),
            UpdateOpcode::Delete => UpdateOp::Delete { field },
            UpdateOpcode::Insert => UpdateOp::Insert {
                field,
                value: next_arg()?,
            },
            UpdateOpcode::Splice => {
                let offset = splice_int(next_arg()?)?;
                let length = splice_int(next_arg()?)?;
                UpdateOp::Splice {
                    field,
                    offset,
                    length,
                    insertion: next_arg()?,
                }
            }
        })
    }

    /// Append this operation's record to `out`
    pub fn encode_into(&self, out: &mut BytesMut) {
        out.put_u32_le(self.field());
        out.put_u8(self.opcode() as u8);
        match self {
            UpdateOp::Set { value, .. }
            | UpdateOp::Insert { value, .. }
            | UpdateOp::Arith { arg: value, .. } => put_field(out, value),
            UpdateOp::Delete { .. } => {}
            UpdateOp::Splice {
                offset,
                length,
                insertion,
                ..
            } => {
                let mut nested = BytesMut::with_capacity(24 + insertion.len());
                put_field(&mut nested, &offset.to_le_bytes());
                put_field(&mut nested, &length.to_le_bytes());
                put_field(&mut nested, insertion);
                put_field(out, &nested);
            }
        }
    }
}

fn arith(field: u32, op: ArithOp, arg: Bytes) -> UpdateOp {
    UpdateOp::Arith { field, op, arg }
}

/// Splice bounds must be 4-byte integers
fn splice_int(arg: Bytes) -> Result<i32> {
    let bytes: [u8; 4] = arg
        .as_ref()
        .try_into()
        .map_err(|_| StoreError::TypeMismatch { expected: "NUM" })?;
    Ok(i32::from_le_bytes(bytes))
}

fn put_field(out: &mut BytesMut, value: &[u8]) {
    out.put_u32_le(value.len() as u32);
    out.put_slice(value);
}

/// An encoded operation stream carried by an UPDATE request
///
/// Decoding is deferred until the target row is known, so a stream is only
/// validated when it is actually applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpStream(Bytes);

impl OpStream {
    /// Wrap undecoded stream bytes
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        OpStream(bytes.into())
    }

    /// Encode a list of operations
    pub fn from_ops(ops: &[UpdateOp]) -> Self {
        OpStream(encode_ops(ops))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode every record; the stream must hold nothing else
    pub fn decode(&self) -> Result<Vec<UpdateOp>> {
        let mut buf = self.0.clone();
        let ops = decode_ops(&mut buf)?;
        if buf.has_remaining() {
            return Err(StoreError::IllegalParams(format!(
                "{} trailing bytes after update operations",
                buf.remaining()
            )));
        }
        Ok(ops)
    }
}

impl From<Vec<UpdateOp>> for OpStream {
    fn from(ops: Vec<UpdateOp>) -> Self {
        OpStream::from_ops(&ops)
    }
}

/// Decode a full operation stream: count followed by that many records
pub fn decode_ops<B: Buf>(buf: &mut B) -> Result<Vec<UpdateOp>> {
    let count = read_u32(buf, "update operation count")? as usize;
    // Smallest record is field_no + opcode
    let mut ops = Vec::with_capacity(count.min(buf.remaining() / 5));
    for _ in 0..count {
        ops.push(UpdateOp::decode(buf)?);
    }
    Ok(ops)
}

/// Encode a full operation stream
pub fn encode_ops(ops: &[UpdateOp]) -> Bytes {
    let mut out = BytesMut::new();
    encode_ops_into(ops, &mut out);
    out.freeze()
}

pub fn encode_ops_into(ops: &[UpdateOp], out: &mut BytesMut) {
    out.put_u32_le(ops.len() as u32);
    for op in ops {
        op.encode_into(out);
    }
}
