//! Schema DSL fuzz target: build a registry from arbitrary text, then use it.
//! Any schema that builds must report sizes that agree with each other, resolve every
//! reference, and decode a zero-filled buffer without panicking or hanging. Whatever
//! decodes must re-encode to the bytes it consumed.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(registry) = fieldpack::Registry::from_dsl(source) else {
        return;
    };
    for schema in registry.schemas() {
        if let Some(n) = schema.fixed_size() {
            assert_eq!(schema.min_size(), n, "{}", schema.name());
        }
        for name in schema.named_references() {
            assert!(registry.contains(name), "{} -> {}", schema.name(), name);
        }
    }

    let options = fieldpack::DecodeOptions {
        max_depth: 8,
        ..Default::default()
    };
    let codec = fieldpack::Codec::with_options(registry, options);
    let zeros = [0u8; 64];
    for schema in codec.registry().schemas() {
        if let Ok(decoded) = codec.decode(schema.name(), &zeros) {
            let bytes = codec.encode(&decoded.packet).expect("decoded packet re-encodes");
            assert_eq!(&bytes[..], &zeros[..decoded.consumed]);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
