//! Fuzz target for packet decoding.
//!
//! Feeds arbitrary bytes to decoders in every wire mode and checks that:
//!
//! 1. Decoding never panics; malformed input is a decode error
//! 2. Any buffer that does decode re-encodes stably: encoding the decoded
//!    packet, decoding that and encoding again yields the same bytes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ticwire::{CompressionMode, PacketCodec, WireConfig};

#[derive(Debug, Arbitrary)]
struct DecodeInput {
    compressed: bool,
    debug_trailer: bool,
    /// Scratch capacity in words; clamped to a valid range
    capacity_words: u16,
    bytes: Vec<u8>,
}

fuzz_target!(|input: DecodeInput| {
    let config = WireConfig {
        compression: if input.compressed {
            CompressionMode::Rle
        } else {
            CompressionMode::None
        },
        capacity_words: usize::from(input.capacity_words).clamp(7, 4096),
        debug_trailer: input.debug_trailer,
    };
    let Ok(mut codec) = PacketCodec::new(config) else {
        return;
    };

    match codec.decode(&input.bytes) {
        Ok(packet) => {
            // Floats may be NaN, so compare encodings rather than packets.
            if let Ok(bytes) = codec.encode_to_vec(&packet) {
                let again = codec.decode(&bytes).expect("re-encoded packet must decode");
                let bytes_again = codec.encode_to_vec(&again).expect("decoded packet must encode");
                assert_eq!(bytes, bytes_again);
            }
        },
        Err(err) => assert!(err.is_decode_error(), "unexpected error: {err}"),
    }
});
