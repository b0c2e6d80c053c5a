//! Float, double and long double fields: layout, bit-exact round trips, truncation.

use fieldpack::{Endianness, ErrorKind, Field, FloatField, LongDouble, Packet, Schema, Value, LONG_DOUBLE_WIDTH};
use std::sync::Arc;

fn round_trip(field: &Field, value: Value) -> Value {
    let bytes = field.encode(&value).expect("encode");
    let (back, used) = field.decode(&bytes, 0).expect("decode");
    assert_eq!(used, bytes.len());
    back
}

#[test]
fn test_single_layout() {
    let be = Field::Float(FloatField::single(Endianness::Big));
    let le = Field::Float(FloatField::single(Endianness::Little));
    assert_eq!(be.encode(&Value::Float(1.0)).expect("encode"), vec![0x3F, 0x80, 0x00, 0x00]);
    assert_eq!(le.encode(&Value::Float(1.0)).expect("encode"), vec![0x00, 0x00, 0x80, 0x3F]);
}

#[test]
fn test_double_layout() {
    let be = Field::Float(FloatField::double(Endianness::Big));
    assert_eq!(
        be.encode(&Value::Double(-2.0)).expect("encode"),
        vec![0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn test_special_values_are_bit_exact() {
    let single = Field::Float(FloatField::single(Endianness::Little));
    for bits in [0x0000_0000u32, 0x8000_0000, 0x7F80_0000, 0xFF80_0000, 0x0000_0001, 0x7FC0_1234, 0x7F80_0001] {
        let v = Value::Float(f32::from_bits(bits));
        match round_trip(&single, v) {
            Value::Float(x) => assert_eq!(x.to_bits(), bits),
            other => panic!("expected float, got {:?}", other),
        }
    }

    let double = Field::Float(FloatField::double(Endianness::Big));
    for bits in [
        0x8000_0000_0000_0000u64,
        0x7FF0_0000_0000_0000,
        0x0000_0000_0000_0001,
        0x7FF0_0000_0000_0ABC,
        0x7FF8_0000_0000_0000,
    ] {
        let v = Value::Double(f64::from_bits(bits));
        assert_eq!(round_trip(&double, v.clone()), v);
    }
}

#[test]
fn test_signed_zeros_differ() {
    assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
}

#[test]
fn test_long_double_layout() {
    let le = Field::Float(FloatField::long_double(Endianness::Little));
    let bytes = le.encode(&Value::LongDouble(LongDouble::from_f64(1.0))).expect("encode");
    assert_eq!(bytes.len(), LONG_DOUBLE_WIDTH);
    assert_eq!(&bytes[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xFF, 0x3F]);
    assert_eq!(&bytes[10..], &[0; 6]);

    let be = Field::Float(FloatField::long_double(Endianness::Big));
    let mut reversed = be.encode(&Value::LongDouble(LongDouble::from_f64(1.0))).expect("encode");
    reversed.reverse();
    assert_eq!(reversed, bytes);
}

#[test]
fn test_long_double_values() {
    let field = Field::Float(FloatField::long_double(Endianness::Little));
    for v in [0.0, -0.0, 1.5, -1e300, f64::MIN_POSITIVE / 8.0, f64::INFINITY, std::f64::consts::E] {
        match round_trip(&field, Value::LongDouble(LongDouble::from_f64(v))) {
            Value::LongDouble(x) => assert_eq!(x.to_f64().to_bits(), v.to_bits()),
            other => panic!("expected long double, got {:?}", other),
        }
    }
}

#[test]
fn test_long_double_keeps_extra_precision_and_padding() {
    let field = Field::Float(FloatField::long_double(Endianness::Big));
    let mut raw = LongDouble::from_parts(false, 16383, (1 << 63) | 0x7FF).to_le_bytes();
    raw[12] = 0xAA;
    let v = Value::LongDouble(LongDouble::from_le_bytes(raw));
    assert_eq!(round_trip(&field, v.clone()), v);
}

#[test]
fn test_long_double_nan() {
    let nan = LongDouble::from_f64(f64::from_bits(0xFFF0_0000_0000_0001));
    assert!(nan.is_nan());
    assert!(nan.is_sign_negative());
    assert!(!LongDouble::from_f64(f64::INFINITY).is_nan());
    assert!(LongDouble::from_f64(f64::NEG_INFINITY).is_infinite());
}

#[test]
fn test_truncated_one_short() {
    for f in [
        FloatField::single(Endianness::Big),
        FloatField::double(Endianness::Little),
        FloatField::long_double(Endianness::Little),
    ] {
        let field = Field::Float(f);
        let buf = vec![0u8; f.width() - 1];
        let err = field.decode(&buf, 0).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::TruncatedInput {
                needed: f.width(),
                available: f.width() - 1
            }
        );
    }
}

#[test]
fn test_widening_from_other_values() {
    let double = Field::Float(FloatField::double(Endianness::Big));
    assert_eq!(double.encode(&Value::Int(3)).expect("encode"), 3.0f64.to_be_bytes().to_vec());
    assert_eq!(double.encode(&Value::Float(0.5)).expect("encode"), 0.5f64.to_be_bytes().to_vec());

    let long = Field::Float(FloatField::long_double(Endianness::Little));
    let from_double = long.encode(&Value::Double(2.0)).expect("encode");
    let exact = long.encode(&Value::LongDouble(LongDouble::from_f64(2.0))).expect("encode");
    assert_eq!(from_double, exact);
}

#[test]
fn test_narrowing_is_rejected() {
    let single = Field::Float(FloatField::single(Endianness::Big));
    let err = single.encode(&Value::Double(1.0)).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::TypeMismatch {
            expected: "float",
            found: "double"
        }
    );
}

#[test]
fn test_widened_values_equal_their_decode() {
    let schema = Arc::new(
        Schema::builder("Widened")
            .field("single", FloatField::single(Endianness::Big))
            .field("double", FloatField::double(Endianness::Big))
            .field("long", FloatField::long_double(Endianness::Little))
            .build()
            .expect("schema"),
    );
    let packet = Packet::new(Arc::clone(&schema))
        .with("single", 3u8)
        .and_then(|p| p.with("double", 0.5f32))
        .and_then(|p| p.with("long", 1.5f64))
        .expect("values");
    assert_eq!(packet.get("single"), Some(&Value::Float(3.0)));
    assert_eq!(packet.get("double"), Some(&Value::Double(0.5)));
    assert_eq!(packet.get("long"), Some(&Value::LongDouble(LongDouble::from_f64(1.5))));

    let bytes = packet.encode().expect("encode");
    let decoded = Packet::decode(&schema, &bytes).expect("decode");
    assert_eq!(decoded.packet, packet);
}
