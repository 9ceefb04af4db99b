//! Fuzz target for direct RLE encode/decode testing.
//!
//! 1. **Roundtrip invariant**: `decode(encode(data), data.len()) == data`
//! 2. **No panics**: arbitrary segment streams are rejected with an error
//! 3. **Bounded output**: decoding never produces more than `original_len` bytes
//!
//! # Safety Properties Tested
//!
//! - Safe handling of lengths that are not a multiple of the word size
//! - Decode handles malformed/truncated segment headers gracefully
//! - `encoded_len` agrees with `encode_into`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ticwire::rle::{decode, decode_into, encode, encode_into, encoded_len};

#[derive(Debug, Arbitrary)]
enum TestMode {
    /// Roundtrip of arbitrary data
    Roundtrip { data: Vec<u8> },

    /// Decoding of arbitrary bytes (usually invalid)
    DecodeArbitrary { bytes: Vec<u8>, original_len: u16 },

    /// Word patterns shaped like encoded packets
    StressPattern { pattern: StressPattern },

    /// Encoding into a destination that may be too small
    BoundedEncode { data: Vec<u8>, capacity: u16 },
}

#[derive(Debug, Arbitrary)]
enum StressPattern {
    /// One word repeated
    Run { len: u16, word: u32 },

    /// Alternating words, no runs at all (worst case)
    Alternating { len: u16 },

    /// Sparse non-zero words among zero flag words
    SparseTics { positions: Vec<u16>, words: u16 },

    /// A run followed by a byte tail
    RunWithTail { len: u8, tail: Vec<u8> },
}

fn generate_stress_pattern(pattern: StressPattern) -> Vec<u8> {
    match pattern {
        StressPattern::Run { len, word } => (0..len).flat_map(|_| word.to_le_bytes()).collect(),

        StressPattern::Alternating { len } => (0..len)
            .flat_map(|i| if i % 2 == 0 { 0u32 } else { 0x4242 }.to_le_bytes())
            .collect(),

        StressPattern::SparseTics { positions, words } => {
            let len = words as usize;
            let mut data = vec![0u32; len];
            for pos in positions {
                let idx = (pos as usize) % len.max(1);
                if let Some(word) = data.get_mut(idx) {
                    *word = u32::from(pos) | 1;
                }
            }
            data.iter().flat_map(|w| w.to_le_bytes()).collect()
        },

        StressPattern::RunWithTail { len, mut tail } => {
            tail.truncate(3);
            let mut data = vec![0u8; len as usize * 4];
            data.extend(&tail);
            data
        },
    }
}

fn check_roundtrip(data: &[u8]) {
    let encoded = encode(data);
    assert_eq!(encoded.len(), encoded_len(data));
    let decoded = decode(&encoded, data.len()).expect("own encoding must decode");
    assert_eq!(
        data,
        decoded.as_slice(),
        "Roundtrip invariant violated: {} bytes encoded to {} bytes",
        data.len(),
        encoded.len()
    );
}

fuzz_target!(|mode: TestMode| {
    match mode {
        TestMode::Roundtrip { data } => check_roundtrip(&data),

        TestMode::DecodeArbitrary {
            bytes,
            original_len,
        } => {
            let original_len = original_len as usize;
            if let Ok(decoded) = decode(&bytes, original_len) {
                assert!(decoded.len() <= original_len);
            }
            let mut dst = vec![0u8; original_len];
            let _ = decode_into(&bytes, original_len, &mut dst);
        },

        TestMode::StressPattern { pattern } => check_roundtrip(&generate_stress_pattern(pattern)),

        TestMode::BoundedEncode { data, capacity } => {
            let mut dst = vec![0u8; capacity as usize];
            match encode_into(&data, &mut dst) {
                Ok(written) => assert_eq!(written, encoded_len(&data)),
                Err(_) => assert!(encoded_len(&data) > dst.len()),
            }
        },
    }
});
