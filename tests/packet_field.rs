//! Nested packets: inline schemas, named references and recursion limits.

use fieldpack::{
    Codec, Condition, DecodeOptions, Endianness, ErrorKind, Field, IntField, Packet, Registry, Schema, Value,
};
use std::sync::Arc;

fn point() -> Arc<Schema> {
    Arc::new(
        Schema::builder("Point")
            .field("x", IntField::i16(Endianness::Big))
            .field("y", IntField::i16(Endianness::Big))
            .build()
            .expect("schema"),
    )
}

fn segment(point: &Arc<Schema>) -> Arc<Schema> {
    Arc::new(
        Schema::builder("Segment")
            .field("id", IntField::u8())
            .field("from", Field::packet(Arc::clone(point)))
            .field("to", Field::packet(Arc::clone(point)))
            .build()
            .expect("schema"),
    )
}

fn make_point(schema: &Arc<Schema>, x: i16, y: i16) -> Packet {
    Packet::new(Arc::clone(schema))
        .with("x", x)
        .and_then(|p| p.with("y", y))
        .expect("point")
}

#[test]
fn test_inline_round_trip() {
    let point = point();
    let segment = segment(&point);
    assert_eq!(segment.fixed_size(), Some(9));

    let packet = Packet::new(Arc::clone(&segment))
        .with("id", 7u8)
        .and_then(|p| p.with("from", make_point(&point, 1, -1)))
        .and_then(|p| p.with("to", make_point(&point, 256, 2)))
        .expect("segment");
    let bytes = packet.encode().expect("encode");
    assert_eq!(bytes, vec![7, 0x00, 0x01, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x02]);

    let decoded = Packet::decode(&segment, &bytes).expect("decode");
    assert_eq!(decoded.consumed, 9);
    assert_eq!(decoded.packet, packet);
    let to = decoded.packet.get("to").and_then(Value::as_packet).expect("nested");
    assert_eq!(to.get_int("x"), Some(256));
}

#[test]
fn test_nested_error_path_and_offset() {
    let point = point();
    let segment = segment(&point);
    let err = Packet::decode(&segment, &[7, 0, 1, 0, 2, 0, 3, 0]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TruncatedInput { needed: 2, available: 1 });
    assert_eq!(err.path.to_string(), "to.y");
    assert_eq!(err.offset, 7);

    let mut incomplete = make_point(&point, 1, 2);
    incomplete.unset("y");
    let packet = Packet::new(Arc::clone(&segment))
        .with("id", 1u8)
        .and_then(|p| p.with("from", make_point(&point, 0, 0)))
        .and_then(|p| p.with("to", incomplete))
        .expect("segment");
    let err = packet.encode().unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingField);
    assert_eq!(err.path.to_string(), "to.y");
    assert_eq!(err.offset, 7);
}

#[test]
fn test_wrong_nested_schema() {
    let point = point();
    let segment = segment(&point);
    let other = Arc::new(
        Schema::builder("Other")
            .field("x", IntField::u8())
            .build()
            .expect("schema"),
    );
    let stray = Packet::new(other).with("x", 1u8).expect("other");
    let packet = Packet::new(segment)
        .with("id", 1u8)
        .and_then(|p| p.with("from", stray))
        .and_then(|p| p.with("to", make_point(&point, 0, 0)))
        .expect("segment");
    let err = packet.encode().unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::SchemaMismatch {
            expected: "Point".to_string(),
            found: "Other".to_string()
        }
    );
    assert_eq!(err.path.to_string(), "from");
}

fn linked_list() -> Codec {
    let node = Schema::builder("Node")
        .field("value", IntField::u8())
        .field("has_next", IntField::u8())
        .conditional("next", Field::packet_named("Node"), Condition::equals("has_next", 1))
        .build()
        .expect("schema");
    let mut registry = Registry::new();
    registry.register(node).expect("register");
    registry.check_references().expect("references");
    Codec::new(registry)
}

fn chain(codec: &Codec, values: &[u8]) -> Packet {
    let mut next: Option<Packet> = None;
    for &v in values.iter().rev() {
        let mut node = codec.new_packet("Node").expect("node");
        node.set("value", v).expect("value");
        match next.take() {
            Some(child) => {
                node.set("has_next", 1u8).expect("has_next");
                node.set("next", child).expect("next");
            }
            None => {
                node.set("has_next", 0u8).expect("has_next");
            }
        }
        next = Some(node);
    }
    next.expect("non-empty chain")
}

#[test]
fn test_recursive_schema_by_name() {
    let codec = linked_list();
    let list = chain(&codec, &[1, 2, 3]);
    let bytes = codec.encode(&list).expect("encode");
    assert_eq!(bytes, vec![1, 1, 2, 1, 3, 0]);

    let decoded = codec.decode("Node", &bytes).expect("decode");
    assert_eq!(decoded.consumed, 6);
    assert_eq!(decoded.packet, list);
}

#[test]
fn test_named_reference_needs_registry() {
    let codec = linked_list();
    let list = chain(&codec, &[1, 2]);
    let err = list.encode().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownPacket("Node".to_string()));
    assert_eq!(err.path.to_string(), "next");
}

#[test]
fn test_nesting_limit() {
    let codec = linked_list();
    let bytes: [u8; 8] = [1, 1, 2, 1, 3, 1, 4, 0];
    let shallow = Codec::with_options(
        codec.registry().clone(),
        DecodeOptions {
            max_depth: 2,
            ..Default::default()
        },
    );
    let err = shallow.decode("Node", &bytes).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NestingTooDeep(2));
    assert_eq!(err.path.to_string(), "next.next.next");
    assert_eq!(err.offset, 6);

    assert!(shallow.decode("Node", &bytes[2..]).is_ok());
    assert!(codec.decode("Node", &bytes).is_ok());
}

#[test]
fn test_unresolved_reference_reported() {
    let schema = Schema::builder("Holder")
        .field("inner", Field::packet_named("Missing"))
        .build()
        .expect("schema");
    assert_eq!(schema.named_references(), vec!["Missing"]);
    let mut registry = Registry::new();
    registry.register(schema).expect("register");
    let err = registry.check_references().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownPacket("Missing".to_string()));
}
