//! Codec Tests
//!
//! Tests for request and response frame encoding/decoding.

use std::io::Cursor;

use bytes::{BufMut, BytesMut};
use tuplestore::protocol::{
    decode_frame, decode_request, decode_response, decode_tuples_body, dml_body,
    encode_raw_request, encode_request, encode_response, read_request, read_response,
    select_body, write_request, write_response, Flags, RawRequest, Request, RequestBody,
    RequestType, Response, Status, HEADER_SIZE, MAX_BODY_SIZE,
};
use tuplestore::tuple::Tuple;
use tuplestore::update::{ArithOp, UpdateOp};
use tuplestore::StoreError;

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_ping() {
    let request = Request::ping(7);
    let encoded = encode_request(&request);

    assert_eq!(encoded.len(), HEADER_SIZE);
    assert_eq!(decode_request(&encoded).unwrap(), request);
}

#[test]
fn test_ping_header_layout() {
    let encoded = encode_request(&Request::ping(0x0102_0304));

    assert_eq!(&encoded[0..4], &0xFF00u32.to_le_bytes());
    assert_eq!(&encoded[4..8], &0u32.to_le_bytes());
    assert_eq!(&encoded[8..12], &0x0102_0304u32.to_le_bytes());
}

#[test]
fn test_encode_decode_insert() {
    let request = Request::insert(
        1,
        3,
        Flags::ADD_TUPLE | Flags::RETURN_TUPLE,
        Tuple::from_fields(["k1", "v1"]),
    );
    let decoded = decode_request(&encode_request(&request)).unwrap();

    match decoded.body {
        RequestBody::Insert { space, flags, tuple } => {
            assert_eq!(space, 3);
            assert!(flags.contains(Flags::ADD_TUPLE));
            assert!(flags.contains(Flags::RETURN_TUPLE));
            assert!(!flags.contains(Flags::REPLACE_TUPLE));
            assert_eq!(tuple, Tuple::from_fields(["k1", "v1"]));
        }
        other => panic!("Expected INSERT request, got {:?}", other),
    }
}

#[test]
fn test_insert_body_layout() {
    let request = Request::insert(9, 2, Flags::REPLACE_TUPLE, Tuple::from_fields(["a"]));
    let encoded = encode_request(&request);

    let mut expected = BytesMut::new();
    expected.put_u32_le(13);
    expected.put_u32_le(8 + 4 + 4 + 1);
    expected.put_u32_le(9);
    expected.put_u32_le(2);
    expected.put_u32_le(0x04);
    expected.put_u32_le(1);
    expected.put_u32_le(1);
    expected.put_slice(b"a");

    assert_eq!(&encoded[..], &expected[..]);
}

#[test]
fn test_encode_decode_select_with_several_keys() {
    let request = Request::select(
        2,
        0,
        1,
        vec![Tuple::from_fields(["x"]), Tuple::from_fields(["y"])],
        5,
        10,
    );

    assert_eq!(decode_request(&encode_request(&request)).unwrap(), request);
}

#[test]
fn test_encode_decode_update_and_delete() {
    let update = Request::update(
        3,
        0,
        Flags::RETURN_TUPLE,
        Tuple::from_fields(["k1"]),
        vec![
            UpdateOp::arith_i32(1, ArithOp::Add, 3),
            UpdateOp::splice(2, 1, 2, "XYZ"),
            UpdateOp::delete(3),
        ],
    );
    let delete = Request::delete(4, 0, Flags::NONE, Tuple::from_fields(["k1"]));

    assert_eq!(decode_request(&encode_request(&update)).unwrap(), update);
    assert_eq!(decode_request(&encode_request(&delete)).unwrap(), delete);
}

#[test]
fn test_decode_unknown_request_type() {
    let raw = RawRequest {
        request_type: 42,
        request_id: 5,
        body: bytes::Bytes::new(),
    };
    let err = decode_request(&encode_raw_request(&raw)).unwrap_err();

    assert!(matches!(err, StoreError::UnknownOperation(42)));
    assert_eq!(err.code(), Some(2));
}

#[test]
fn test_decode_frame_keeps_unknown_type() {
    let raw = RawRequest {
        request_type: 42,
        request_id: 5,
        body: bytes::Bytes::from_static(b"abc"),
    };

    assert_eq!(decode_frame(&encode_raw_request(&raw), MAX_BODY_SIZE).unwrap(), raw);
}

#[test]
fn test_decode_incomplete_header() {
    let err = decode_request(&[0u8; 5]).unwrap_err();
    assert!(matches!(err, StoreError::IllegalParams(_)));
}

#[test]
fn test_decode_incomplete_body() {
    let mut encoded = encode_request(&Request::delete(1, 0, Flags::NONE, Tuple::from_fields(["k"]))).to_vec();
    encoded.pop();

    assert!(decode_request(&encoded).is_err());
}

#[test]
fn test_decode_body_too_large() {
    let mut frame = BytesMut::new();
    frame.put_u32_le(RequestType::Insert as u32);
    frame.put_u32_le(1024);
    frame.put_u32_le(1);

    let err = decode_frame(&frame, 512).unwrap_err();
    assert!(matches!(err, StoreError::IllegalParams(_)));
}

#[test]
fn test_decode_rejects_trailing_body_bytes() {
    let mut body = BytesMut::new();
    body.put_u32_le(0);
    body.put_u32_le(0);
    Tuple::from_fields(["k"]).pack_into(&mut body);
    body.put_u8(0xAA);

    let raw = RawRequest {
        request_type: RequestType::Delete as u32,
        request_id: 1,
        body: body.freeze(),
    };

    assert!(Request::try_from(&raw).is_err());
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_ping_response() {
    let response = Response::ping(11);
    let encoded = encode_response(&response);

    assert_eq!(encoded.len(), HEADER_SIZE);
    assert_eq!(decode_response(&encoded).unwrap(), response);
}

#[test]
fn test_dml_response_layout() {
    let response = Response::ok(RequestType::Delete, 3, dml_body(1, None));
    let encoded = encode_response(&response);

    let mut expected = BytesMut::new();
    expected.put_u32_le(21);
    expected.put_u32_le(8);
    expected.put_u32_le(3);
    expected.put_u32_le(0);
    expected.put_u32_le(1);

    assert_eq!(&encoded[..], &expected[..]);
    assert_eq!(decode_response(&encoded).unwrap(), response);
}

#[test]
fn test_dml_body_with_returned_tuple() {
    let tuple = Tuple::from_fields(["k1", "v1"]);
    let body = dml_body(1, Some(&tuple));

    let mut expected = BytesMut::new();
    expected.put_u32_le(1);
    expected.put_u32_le(tuple.packed_len() as u32);
    expected.put_slice(&tuple.pack());

    assert_eq!(&body[..], &expected[..]);
    assert_eq!(decode_tuples_body(&body).unwrap(), vec![tuple]);
}

#[test]
fn test_select_body_layout() {
    let a = Tuple::from_fields(["a"]);
    let b = Tuple::from_fields(["b", "c"]);
    let body = select_body([&a, &b]);

    let mut expected = BytesMut::new();
    expected.put_u32_le(2);
    expected.put_u32_le(a.packed_len() as u32);
    expected.put_slice(&a.pack());
    expected.put_u32_le(b.packed_len() as u32);
    expected.put_slice(&b.pack());

    assert_eq!(&body[..], &expected[..]);
    assert_eq!(decode_tuples_body(&body).unwrap(), vec![a, b]);
}

#[test]
fn test_empty_select_body() {
    let body = select_body(Vec::<&Tuple>::new());

    assert_eq!(&body[..], &0u32.to_le_bytes());
    assert!(decode_tuples_body(&body).unwrap().is_empty());
}

#[test]
fn test_encode_decode_error_response() {
    let response = Response::error(RequestType::Insert as u32, 8, &StoreError::DuplicateKey);
    let encoded = encode_response(&response);

    // Return code word follows the header
    assert_eq!(&encoded[12..16], &((55u32 << 8) | 2).to_le_bytes());

    let decoded = decode_response(&encoded).unwrap();
    assert_eq!(decoded.error_code(), Some(55));
    match decoded.status {
        Status::Error { message, .. } => assert_eq!(message, "Duplicate key exists in a unique index"),
        Status::Ok => panic!("Expected error status"),
    }
}

#[test]
fn test_decode_response_unknown_return_code() {
    let mut frame = BytesMut::new();
    frame.put_u32_le(13);
    frame.put_u32_le(4);
    frame.put_u32_le(1);
    frame.put_u32_le(0x0101);

    assert!(decode_response(&frame).is_err());
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_request_round_trip() {
    let request = Request::insert(1, 0, Flags::NONE, Tuple::from_fields(["k", "v"]));
    let mut buffer = Vec::new();
    write_request(&mut buffer, &request).unwrap();

    let mut cursor = Cursor::new(buffer);
    let raw = read_request(&mut cursor, MAX_BODY_SIZE).unwrap();

    assert_eq!(Request::try_from(&raw).unwrap(), request);
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        Response::ping(1),
        Response::ok(RequestType::Update, 2, dml_body(0, None)),
        Response::error(RequestType::Select as u32, 3, &StoreError::NoSuchIndex { space: 0, index: 4 }),
    ];

    let mut buffer = Vec::new();
    for response in &responses {
        write_response(&mut buffer, response).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_eof_is_io_error() {
    let mut cursor = Cursor::new(vec![0u8; 3]);

    let err = read_request(&mut cursor, MAX_BODY_SIZE).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    assert_eq!(err.code(), None);
}
