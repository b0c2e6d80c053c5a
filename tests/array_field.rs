//! Array fields: fixed counts, counted decode, error paths.

use fieldpack::{ArrayField, Count, Endianness, ErrorKind, Field, IntField, PathSegment, Value};

fn u16s(count: usize) -> Field {
    Field::array(Field::Int(IntField::u16(Endianness::Big)), count)
}

#[test]
fn test_fixed_round_trip() {
    let field = u16s(3);
    let value = Value::from(vec![1u16, 0x0203, 0xFFFF]);
    let bytes = field.encode(&value).expect("encode");
    assert_eq!(bytes, vec![0x00, 0x01, 0x02, 0x03, 0xFF, 0xFF]);
    let (back, used) = field.decode(&bytes, 0).expect("decode");
    assert_eq!(back, value);
    assert_eq!(used, 6);
}

#[test]
fn test_length_mismatch() {
    let field = u16s(2);
    let err = field.encode(&Value::from(vec![1u16, 2, 3])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LengthMismatch { expected: 2, actual: 3 });
    let err = field.encode(&Value::from(vec![1u16])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::LengthMismatch { expected: 2, actual: 1 });
}

#[test]
fn test_empty_array() {
    let field = u16s(0);
    assert!(field.encode(&Value::List(vec![])).expect("encode").is_empty());
    assert_eq!(field.decode(&[], 0).expect("decode"), (Value::List(vec![]), 0));
}

#[test]
fn test_element_error_carries_index() {
    let field = Field::array(Field::Int(IntField::u8()), 3);
    let err = field.encode(&Value::from(vec![1u16, 2, 300])).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ValueOutOfRange { value: 300, .. }));
    assert_eq!(err.path.segments(), &[PathSegment::Index(2)]);
    assert_eq!(err.offset, 2);
    assert_eq!(err.path.to_string(), "[2]");
}

#[test]
fn test_truncated_decode() {
    let field = u16s(3);
    let err = field.decode(&[0u8; 5], 0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TruncatedInput { needed: 6, available: 5 });
}

#[test]
fn test_huge_count_fails_without_allocating() {
    let field = ArrayField::fixed(Field::Int(IntField::u32(Endianness::Big)), 0);
    let err = field.decode_counted(&[0u8; 8], 0, usize::MAX / 2).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TruncatedInput { .. }));
}

#[test]
fn test_decode_counted() {
    let array = ArrayField::prefixed(Field::Int(IntField::u8()));
    assert!(array.is_prefixed());
    assert_eq!(array.count(), &Count::Prefixed);
    let (items, used) = array.decode_counted(&[9, 1, 2, 3], 1, 2).expect("decode");
    assert_eq!(items, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(used, 2);
}

#[test]
fn test_prefixed_needs_a_packet() {
    let field = Field::prefixed_array(Field::Int(IntField::u8()));
    let err = field.decode(&[1, 2], 0).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidSchema(_)));
    assert_eq!(field.fixed_width(), None);
    assert_eq!(field.min_width(), 0);
}

#[test]
fn test_nested_arrays() {
    let grid = Field::array(Field::array(Field::Int(IntField::u8()), 2), 2);
    assert_eq!(grid.fixed_width(), Some(4));
    let value = Value::List(vec![Value::from(vec![1u8, 2]), Value::from(vec![3u8, 4])]);
    let bytes = grid.encode(&value).expect("encode");
    assert_eq!(bytes, vec![1, 2, 3, 4]);
    assert_eq!(grid.decode(&bytes, 0).expect("decode").0, value);

    let err = grid
        .encode(&Value::List(vec![Value::from(vec![1u8, 2]), Value::from(vec![3u8])]))
        .unwrap_err();
    assert_eq!(err.to_string(), "[1] @ byte 2: length mismatch: expected 2 elements, got 1");
}
