//! Benchmark: encode and decode of a telemetry frame with a flag-gated extension,
//! a length-prefixed sample array and a nested header.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fieldpack::{Codec, FlagSet, Packet, Registry};

const SCHEMA: &str = r#"
default_endian little;

packet Header {
  version: u8;
  seq: u32;
  stamp: f64;
}

packet Frame {
  header: Header;
  flags: flags(u8) { calibrated: 0, extended: 1 };
  count: u16;
  samples: f32[count];
  extra: f80 if flags.extended;
}
"#;

fn build_frame(codec: &Codec, samples: usize) -> Packet {
    let mut header = codec.new_packet("Header").expect("header");
    header
        .set("version", 1u8)
        .and_then(|p| p.set("seq", 42u32))
        .and_then(|p| p.set("stamp", 1_700_000_000.25f64))
        .expect("header values");
    let values: Vec<f32> = (0..samples).map(|i| i as f32 * 0.5).collect();
    let mut frame = codec.new_packet("Frame").expect("frame");
    frame
        .set("header", header)
        .and_then(|p| p.set("flags", FlagSet::new().with("calibrated", true).with("extended", true)))
        .and_then(|p| p.set("count", samples as u16))
        .and_then(|p| p.set("samples", values))
        .and_then(|p| p.set("extra", std::f64::consts::PI))
        .expect("frame values");
    frame
}

fn bench_codec(c: &mut Criterion) {
    let codec = Codec::new(Registry::from_dsl(SCHEMA).expect("schema"));
    let frame = build_frame(&codec, 256);
    let bytes = codec.encode(&frame).expect("encode");

    c.bench_function("encode_frame_256_samples", |b| {
        b.iter(|| black_box(codec.encode(black_box(&frame)).expect("encode")))
    });

    c.bench_function("decode_frame_256_samples", |b| {
        b.iter(|| black_box(codec.decode("Frame", black_box(&bytes)).expect("decode")))
    });

    c.bench_function("decode_encode_frame_256_samples", |b| {
        b.iter(|| {
            let decoded = codec.decode("Frame", black_box(&bytes)).expect("decode");
            black_box(codec.encode(&decoded.packet).expect("encode"))
        })
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
