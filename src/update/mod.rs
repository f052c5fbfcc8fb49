//! Field-Operation Interpreter
//!
//! Applies decoded update operations to a stored row.
//!
//! ## Semantics
//! - Every operation first checks `field < tuple.len()` (`FieldNotFound`)
//! - Arithmetic reads the field as `i32` or `i64` by its width (`TypeMismatch` otherwise)
//! - DELETE may not leave fewer than two fields (`MalformedTuple`)
//! - After each step the working row is validated against every index of the
//!   space as if it had been re-inserted; the space itself changes only once,
//!   after the last step succeeds

mod op;

pub use op::{
    decode_ops, encode_ops, encode_ops_into, ArithOp, OpStream, UpdateOp, UpdateOpcode,
};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, StoreError};
use crate::space::{Space, TupleId};
use crate::tuple::Tuple;

/// Fewest fields a row may keep after a field delete
pub const MIN_FIELDS_AFTER_DELETE: usize = 2;

/// Apply one operation to `tuple` in place
pub fn apply(tuple: &mut Tuple, op: &UpdateOp) -> Result<()> {
    let field = op.field();
    let index = field as usize;
    if index >= tuple.len() {
        return Err(StoreError::FieldNotFound(field));
    }

    match op {
        UpdateOp::Set { value, .. } => tuple.set_bytes(index, value.clone()),
        UpdateOp::Arith { op, arg, .. } => arith(tuple, index, *op, arg),
        UpdateOp::Delete { .. } => {
            if tuple.len() - 1 < MIN_FIELDS_AFTER_DELETE {
                return Err(StoreError::MalformedTuple);
            }
            *tuple = tuple.remove_field(index)?;
            Ok(())
        }
        UpdateOp::Insert { value, .. } => {
            *tuple = tuple.insert_field(index, value.clone())?;
            Ok(())
        }
        UpdateOp::Splice {
            offset,
            length,
            insertion,
            ..
        } => {
            let current = tuple.field(index).cloned().unwrap_or_default();
            let spliced = splice(&current, *offset, *length, insertion);
            tuple.set_bytes(index, spliced)
        }
    }
}

/// Run a full operation list against row `id` of `space`
///
/// Returns the final row without storing it; the caller commits it with
/// [`Space::replace`]. Nothing in the space changes here.
pub fn apply_ops(space: &Space, id: TupleId, ops: &[UpdateOp]) -> Result<Tuple> {
    let mut working = space
        .get(id)
        .cloned()
        .ok_or_else(|| StoreError::Internal(format!("update of missing row {:?}", id)))?;

    for op in ops {
        apply(&mut working, op)?;
        space.check_replace(id, &working)?;
        tracing::trace!(space = space.id(), ?op, fields = working.len(), "update step applied");
    }
    Ok(working)
}

fn arith(tuple: &mut Tuple, index: usize, op: ArithOp, arg: &[u8]) -> Result<()> {
    let arg = match arg.len() {
        4 => Arg::Narrow(i32::from_le_bytes([arg[0], arg[1], arg[2], arg[3]])),
        8 => Arg::Wide(i64::from_le_bytes([
            arg[0], arg[1], arg[2], arg[3], arg[4], arg[5], arg[6], arg[7],
        ])),
        _ => return Err(StoreError::TypeMismatch { expected: "NUM or NUM64" }),
    };

    if let Some(value) = tuple.get_i32(index) {
        let arg = match arg {
            Arg::Narrow(v) => v,
            // Truncate to the stored width
            Arg::Wide(v) => v as i32,
        };
        tuple.set_i32(index, op.apply_i32(value, arg))
    } else if let Some(value) = tuple.get_i64(index) {
        let arg = match arg {
            Arg::Narrow(v) => i64::from(v),
            Arg::Wide(v) => v,
        };
        tuple.set_i64(index, op.apply_i64(value, arg))
    } else {
        Err(StoreError::TypeMismatch { expected: "NUM or NUM64" })
    }
}

enum Arg {
    Narrow(i32),
    Wide(i64),
}

/// Replace `[offset, offset + length)` of `field` with `insertion`
///
/// Negative offsets count from the end; negative lengths stop that many bytes
/// before the end. Both are clamped to the field.
fn splice(field: &[u8], offset: i32, length: i32, insertion: &[u8]) -> Bytes {
    let len = field.len() as i64;

    let mut from = i64::from(offset);
    if from < 0 {
        from += len;
    }
    let from = from.clamp(0, len);

    let remaining = len - from;
    let mut cut = i64::from(length);
    if cut < 0 {
        cut += remaining;
    }
    let cut = cut.clamp(0, remaining);

    let (from, to) = (from as usize, (from + cut) as usize);
    let mut out = BytesMut::with_capacity(field.len() - (to - from) + insertion.len());
    out.put_slice(&field[..from]);
    out.put_slice(insertion);
    out.put_slice(&field[to..]);
    out.freeze()
}
