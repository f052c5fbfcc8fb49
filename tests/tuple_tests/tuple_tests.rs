//! Tests for Tuple
//!
//! These tests verify:
//! - Typed field accessors
//! - Field insert/delete shape changes
//! - Projection
//! - Packed wire form and malformed input handling

use tuplestore::tuple::Tuple;
use tuplestore::StoreError;

// =============================================================================
// Accessor Tests
// =============================================================================

#[test]
fn test_tuple_builder_and_raw_access() {
    let tuple = Tuple::new().with_field("k1").with_field("v1");

    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple.get_bytes(0), Some(&b"k1"[..]));
    assert_eq!(tuple.get_bytes(1), Some(&b"v1"[..]));
    assert_eq!(tuple.get_bytes(2), None);
}

#[test]
fn test_tuple_integer_accessors() {
    let tuple = Tuple::new().with_i32(-5).with_i64(1 << 40).with_field("abc");

    assert_eq!(tuple.get_i32(0), Some(-5));
    assert_eq!(tuple.get_i64(1), Some(1 << 40));
    assert_eq!(tuple.get_bytes(0), Some(&(-5i32).to_le_bytes()[..]));

    // Wrong width or absent field
    assert_eq!(tuple.get_i64(0), None);
    assert_eq!(tuple.get_i32(1), None);
    assert_eq!(tuple.get_i32(2), None);
    assert_eq!(tuple.get_i32(3), None);
}

#[test]
fn test_tuple_set_existing_field() {
    let mut tuple = Tuple::from_fields(["a", "b"]);

    tuple.set_i32(1, 42).unwrap();
    assert_eq!(tuple.get_i32(1), Some(42));

    tuple.set_bytes(0, "zz").unwrap();
    assert_eq!(tuple.get_bytes(0), Some(&b"zz"[..]));
    assert_eq!(tuple.len(), 2);
}

#[test]
fn test_tuple_set_out_of_range_fails() {
    let mut tuple = Tuple::from_fields(["a"]);

    let err = tuple.set_i64(3, 1).unwrap_err();
    assert!(matches!(err, StoreError::FieldNotFound(3)));
}

// =============================================================================
// Shape Change Tests
// =============================================================================

#[test]
fn test_tuple_insert_field_shifts_up() {
    let tuple = Tuple::from_fields(["a", "c"]);

    let inserted = tuple.insert_field(1, "b").unwrap();
    assert_eq!(inserted, Tuple::from_fields(["a", "b", "c"]));

    let appended = tuple.insert_field(2, "d").unwrap();
    assert_eq!(appended, Tuple::from_fields(["a", "c", "d"]));

    // Original untouched
    assert_eq!(tuple.len(), 2);
}

#[test]
fn test_tuple_remove_field_shifts_down() {
    let tuple = Tuple::from_fields(["a", "b", "c"]);

    assert_eq!(tuple.remove_field(0).unwrap(), Tuple::from_fields(["b", "c"]));
    assert_eq!(tuple.remove_field(2).unwrap(), Tuple::from_fields(["a", "b"]));
    assert!(matches!(
        tuple.remove_field(3).unwrap_err(),
        StoreError::FieldNotFound(3)
    ));
}

#[test]
fn test_tuple_project() {
    let tuple = Tuple::from_fields(["a", "b", "c"]);

    assert_eq!(tuple.project(&[2, 0]).unwrap(), Tuple::from_fields(["c", "a"]));
    assert!(matches!(
        tuple.project(&[0, 5]).unwrap_err(),
        StoreError::FieldNotFound(5)
    ));
}

// =============================================================================
// Packed Form Tests
// =============================================================================

#[test]
fn test_tuple_pack_layout() {
    let tuple = Tuple::from_fields(["ab", ""]);
    let packed = tuple.pack();

    let expected: Vec<u8> = [
        &2u32.to_le_bytes()[..],
        &2u32.to_le_bytes()[..],
        &b"ab"[..],
        &0u32.to_le_bytes()[..],
    ]
    .concat();

    assert_eq!(&packed[..], &expected[..]);
    assert_eq!(tuple.packed_len(), expected.len());
}

#[test]
fn test_tuple_pack_unpack_preserves_fields() {
    let binary: Vec<u8> = (0..=255).collect();
    let tuple = Tuple::new()
        .with_field("key")
        .with_field(binary)
        .with_field("")
        .with_i64(-1);

    let unpacked = Tuple::from_packed(&tuple.pack()).unwrap();

    assert_eq!(unpacked, tuple);
    assert_eq!(unpacked.get_i64(3), Some(-1));
}

#[test]
fn test_tuple_unpack_advances_buffer() {
    let first = Tuple::from_fields(["a"]);
    let second = Tuple::from_fields(["b", "c"]);
    let mut joined = first.pack().to_vec();
    joined.extend_from_slice(&second.pack());

    let mut buf = &joined[..];
    assert_eq!(Tuple::unpack(&mut buf).unwrap(), first);
    assert_eq!(Tuple::unpack(&mut buf).unwrap(), second);
    assert!(buf.is_empty());
}

#[test]
fn test_tuple_unpack_empty_tuple() {
    let tuple = Tuple::new();
    let unpacked = Tuple::from_packed(&tuple.pack()).unwrap();
    assert!(unpacked.is_empty());
}

#[test]
fn test_tuple_unpack_truncated_field() {
    let mut packed = Tuple::from_fields(["hello"]).pack().to_vec();
    packed.truncate(packed.len() - 2);

    let err = Tuple::from_packed(&packed).unwrap_err();
    assert!(matches!(err, StoreError::IllegalParams(_)));
    assert_eq!(err.code(), Some(2));
}

#[test]
fn test_tuple_unpack_huge_count_fails_cleanly() {
    let packed = u32::MAX.to_le_bytes();

    let err = Tuple::from_packed(&packed).unwrap_err();
    assert!(matches!(err, StoreError::IllegalParams(_)));
}

#[test]
fn test_tuple_from_packed_rejects_trailing_bytes() {
    let mut packed = Tuple::from_fields(["a"]).pack().to_vec();
    packed.push(0);

    assert!(Tuple::from_packed(&packed).is_err());
}
