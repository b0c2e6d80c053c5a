//! Decode fuzz target: decode arbitrary bytes against a fixed schema set.
//! Decode must not panic or over-allocate. Whatever decodes must re-encode to the
//! bytes it consumed.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const SCHEMA: &str = r#"
packet Node {
  kind: u8;
  flags: flags(u8) { more: 0, wide: 1 };
  n: u16;
  items: i32[n];
  wide: f80 if flags.wide;
  narrow: f32 if !flags.wide;
  tag: u64le if kind == 3;
  next: Node if flags.more;
}
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let registry = match fieldpack::Registry::from_dsl(SCHEMA) {
        Ok(r) => r,
        Err(_) => return,
    };
    let codec = fieldpack::Codec::new(registry);
    if let Ok(decoded) = codec.decode("Node", data) {
        let bytes = codec.encode(&decoded.packet).expect("decoded packet re-encodes");
        assert_eq!(&bytes[..], &data[..decoded.consumed]);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
