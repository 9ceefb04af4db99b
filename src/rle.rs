//! # Run-Length Encoding Module
//!
//! Word-granular run-length encoding for encoded packets. Packet buffers are
//! flat streams of 32-bit words in which a quiet tic costs a single zero
//! flags word, so long runs of identical words are the common case.
//!
//! ## Format
//!
//! The stream is a series of segments. Each segment starts with a LEB128
//! varint header `count << 2 | tag`:
//!
//! - **Literal words** (`tag = 0`): followed by `count * 4` raw bytes.
//! - **Repeated word** (`tag = 1`): followed by one 4-byte word, expanded `count` times.
//! - **Byte tail** (`tag = 2`): followed by `count` raw bytes (`1..=3`). Only
//!   emitted last, for inputs whose length is not a multiple of 4.
//!
//! Runs are emitted for two or more identical consecutive words. The stream
//! carries no total length; the decoder is bounded by the `original_len`
//! argument and by the destination slice.
//!
//! ## Example
//!
//! ```
//! use ticwire::rle::{decode, encode};
//!
//! let mut data = vec![0u8; 64];
//! data.extend_from_slice(&[1, 2, 3, 4, 5]);
//! let encoded = encode(&data);
//! assert!(encoded.len() < data.len());
//! assert_eq!(decode(&encoded, data.len()).unwrap(), data);
//! ```

use crate::error::{CorruptReason, Result, SizeUnit, TicwireError};

/// Size of one token in bytes.
pub const WORD_BYTES: usize = 4;

const TAG_LITERAL: u64 = 0;
const TAG_RUN: u64 = 1;
const TAG_TAIL: u64 = 2;

/// Varint encoding/decoding utilities.
///
/// Uses LEB128 (Little Endian Base 128) variable-length encoding.
mod varint {
    /// Largest encoding of a `u64`.
    pub const MAX_LEN: usize = 10;

    /// Why a varint could not be read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum VarintError {
        /// The buffer ended inside the varint.
        Truncated,
        /// More than 64 bits of payload.
        Overflow,
    }

    /// Returns the number of bytes needed to encode a value.
    #[inline]
    pub fn encoded_len(value: u64) -> usize {
        if value == 0 {
            return 1;
        }
        let bits = 64 - value.leading_zeros() as usize;
        bits.div_ceil(7)
    }

    /// Encodes a value into `buf`, which must hold [`MAX_LEN`] bytes.
    /// Returns the number of bytes written.
    #[inline]
    pub fn encode(mut value: u64, buf: &mut [u8; MAX_LEN]) -> usize {
        let mut i = 0;
        while value >= 0x80 {
            buf[i] = (value as u8) | 0x80;
            value >>= 7;
            i += 1;
        }
        buf[i] = value as u8;
        i + 1
    }

    /// Decodes a varint from the buffer starting at offset.
    /// Returns (decoded_value, bytes_consumed).
    #[inline]
    pub fn decode(buf: &[u8], offset: usize) -> Result<(u64, usize), VarintError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        let mut i = offset;

        loop {
            let byte = *buf.get(i).ok_or(VarintError::Truncated)?;
            if shift == 63 && byte > 1 {
                return Err(VarintError::Overflow);
            }
            value |= u64::from(byte & 0x7F) << shift;
            i += 1;

            if byte & 0x80 == 0 {
                return Ok((value, i - offset));
            }
            shift += 7;
            if shift > 63 {
                return Err(VarintError::Overflow);
            }
        }
    }
}

/// One segment of the encoded stream, borrowing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a [u8]),
    Run { word: &'a [u8], count: usize },
    Tail(&'a [u8]),
}

impl Segment<'_> {
    fn header(&self) -> u64 {
        match self {
            Segment::Literal(bytes) => ((bytes.len() / WORD_BYTES) as u64) << 2 | TAG_LITERAL,
            Segment::Run { count, .. } => (*count as u64) << 2 | TAG_RUN,
            Segment::Tail(bytes) => (bytes.len() as u64) << 2 | TAG_TAIL,
        }
    }

    fn payload(&self) -> &[u8] {
        match self {
            Segment::Literal(bytes) | Segment::Tail(bytes) => bytes,
            Segment::Run { word, .. } => word,
        }
    }

    fn encoded_len(&self) -> usize {
        varint::encoded_len(self.header()) + self.payload().len()
    }
}

#[inline]
fn word_at(src: &[u8], i: usize) -> &[u8] {
    &src[i * WORD_BYTES..(i + 1) * WORD_BYTES]
}

/// Walks `src` and hands every segment to `emit`, stopping at the first error.
fn for_each_segment<'a>(
    src: &'a [u8],
    mut emit: impl FnMut(Segment<'a>) -> Result<()>,
) -> Result<()> {
    let words = src.len() / WORD_BYTES;

    let mut literal_start = 0;
    let mut i = 0;
    while i < words {
        let mut j = i + 1;
        while j < words && word_at(src, j) == word_at(src, i) {
            j += 1;
        }
        if j - i >= 2 {
            if literal_start < i {
                emit(Segment::Literal(
                    &src[literal_start * WORD_BYTES..i * WORD_BYTES],
                ))?;
            }
            emit(Segment::Run {
                word: word_at(src, i),
                count: j - i,
            })?;
            literal_start = j;
        }
        i = j;
    }
    if literal_start < words {
        emit(Segment::Literal(
            &src[literal_start * WORD_BYTES..words * WORD_BYTES],
        ))?;
    }

    let tail = &src[words * WORD_BYTES..];
    if !tail.is_empty() {
        emit(Segment::Tail(tail))?;
    }
    Ok(())
}

/// Returns the exact length [`encode_into`] produces for `src`.
#[must_use]
pub fn encoded_len(src: &[u8]) -> usize {
    let mut len = 0;
    // The callback never fails.
    let _ = for_each_segment(src, |segment| {
        len += segment.encoded_len();
        Ok(())
    });
    len
}

/// Upper bound on [`encoded_len`] for any input of `src_len` bytes.
///
/// Incompressible input grows by one literal header and one tail header.
/// Every later literal header is paid for by the run in front of it; the
/// `src_len / 64` allowance covers the few that are not, on multi-megabyte
/// inputs.
///
/// ```
/// use ticwire::rle::{encode, max_encoded_len};
///
/// let data: Vec<u8> = (0..=255).collect();
/// assert!(encode(&data).len() <= max_encoded_len(data.len()));
/// ```
#[must_use]
pub const fn max_encoded_len(src_len: usize) -> usize {
    src_len + src_len / 64 + varint::MAX_LEN + 1
}

/// Encodes `src` into `dst`, returning the number of bytes written.
///
/// # Errors
///
/// Returns [`TicwireError::EncodeOverflow`] if the output does not fit `dst`.
/// `dst` is left partially written; the caller decides whether to send the
/// packet uncompressed, split it, or drop it.
pub fn encode_into(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut pos = 0;
    let capacity = dst.len();
    let result = for_each_segment(src, |segment| {
        let mut header = [0u8; varint::MAX_LEN];
        let header_len = varint::encode(segment.header(), &mut header);
        let payload = segment.payload();
        let end = pos + header_len + payload.len();
        let out = dst.get_mut(pos..end).ok_or(TicwireError::EncodeOverflow {
            required: end,
            capacity,
            unit: SizeUnit::Bytes,
        })?;
        out[..header_len].copy_from_slice(&header[..header_len]);
        out[header_len..].copy_from_slice(payload);
        pos = end;
        Ok(())
    });

    match result {
        Ok(()) => Ok(pos),
        Err(TicwireError::EncodeOverflow { capacity, unit, .. }) => {
            Err(TicwireError::EncodeOverflow {
                required: encoded_len(src),
                capacity,
                unit,
            })
        },
        Err(other) => Err(other),
    }
}

/// Encodes `src` into a freshly allocated buffer.
///
/// # Example
///
/// ```
/// use ticwire::rle::encode;
///
/// // 32 zero words collapse to a single run segment.
/// let encoded = encode(&[0u8; 128]);
/// assert_eq!(encoded.len(), 6);
/// ```
#[must_use]
pub fn encode(src: impl AsRef<[u8]>) -> Vec<u8> {
    let src = src.as_ref();
    let mut out = vec![0u8; encoded_len(src)];
    // The buffer is sized exactly, so this cannot overflow.
    let written = encode_into(src, &mut out).unwrap_or(0);
    out.truncate(written);
    out
}

/// Decodes `src` into `dst`, returning the number of bytes produced.
///
/// `original_len` bounds the decoded output: a segment that would write past
/// it is rejected.
///
/// # Errors
///
/// - [`TicwireError::DecodeCorrupt`] if a segment would write past
///   `original_len`, carries an unknown tag, or `dst` is shorter than
///   `original_len`.
/// - [`TicwireError::DecodeTruncated`] if a header or payload is cut short.
pub fn decode_into(src: &[u8], original_len: usize, dst: &mut [u8]) -> Result<usize> {
    if dst.len() < original_len {
        return Err(TicwireError::corrupt(CorruptReason::OversizedInput {
            len: original_len,
            capacity: dst.len(),
        }));
    }

    let mut offset = 0;
    let mut out: usize = 0;
    let mut after_tail = false;

    while offset < src.len() {
        let header_at = offset;
        let (header, consumed) = varint::decode(src, offset).map_err(|e| match e {
            varint::VarintError::Truncated => TicwireError::DecodeTruncated {
                needed: src.len() + 1,
                available: src.len(),
                unit: SizeUnit::Bytes,
            },
            varint::VarintError::Overflow => {
                TicwireError::corrupt(CorruptReason::RleVarintOverflow { offset: header_at })
            },
        })?;
        offset += consumed;

        if after_tail {
            return Err(TicwireError::corrupt(CorruptReason::RleMalformedTail {
                offset: header_at,
                count: 0,
            }));
        }

        let count = usize::try_from(header >> 2).unwrap_or(usize::MAX);
        let tag = header & 3;
        let (decoded_len, payload_len) = match tag {
            TAG_LITERAL => {
                let bytes = count.saturating_mul(WORD_BYTES);
                (bytes, bytes)
            },
            TAG_RUN => (count.saturating_mul(WORD_BYTES), WORD_BYTES),
            TAG_TAIL => {
                if count == 0 || count >= WORD_BYTES {
                    return Err(TicwireError::corrupt(CorruptReason::RleMalformedTail {
                        offset: header_at,
                        count,
                    }));
                }
                after_tail = true;
                (count, count)
            },
            _ => {
                return Err(TicwireError::corrupt(CorruptReason::RleUnknownTag {
                    offset: header_at,
                    tag: tag as u8,
                }));
            },
        };

        let end = out.saturating_add(decoded_len);
        if end > original_len {
            return Err(TicwireError::corrupt(CorruptReason::RleSegmentOverrun {
                offset: header_at,
                end,
                limit: original_len,
            }));
        }
        let payload = src
            .get(offset..offset + payload_len)
            .ok_or(TicwireError::DecodeTruncated {
                needed: offset + payload_len,
                available: src.len(),
                unit: SizeUnit::Bytes,
            })?;
        offset += payload_len;

        let target = &mut dst[out..end];
        if tag == TAG_RUN {
            for chunk in target.chunks_exact_mut(WORD_BYTES) {
                chunk.copy_from_slice(payload);
            }
        } else {
            target.copy_from_slice(payload);
        }
        out = end;
    }

    Ok(out)
}

/// Decodes `src` into a freshly allocated buffer of at most `original_len` bytes.
///
/// # Errors
///
/// Same as [`decode_into`].
pub fn decode(src: impl AsRef<[u8]>, original_len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; original_len];
    let written = decode_into(src.as_ref(), original_len, &mut out)?;
    out.truncate(written);
    Ok(out)
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    // ================
    // Varint tests
    // ================

    #[test]
    fn test_varint_encode_decode_small() {
        for value in 0..128u64 {
            let mut buf = [0u8; varint::MAX_LEN];
            let written = varint::encode(value, &mut buf);
            assert_eq!(written, 1, "value {} should encode to 1 byte", value);
            assert_eq!(varint::decode(&buf, 0), Ok((value, 1)));
        }
    }

    #[test]
    fn test_varint_encode_decode_large() {
        for value in [128u64, 16384, u64::from(u32::MAX), u64::MAX] {
            let mut buf = [0u8; varint::MAX_LEN];
            let written = varint::encode(value, &mut buf);
            assert_eq!(written, varint::encoded_len(value));
            assert_eq!(varint::decode(&buf, 0), Ok((value, written)));
        }
    }

    #[test]
    fn test_varint_truncated_and_overflow() {
        assert_eq!(
            varint::decode(&[0x80, 0x80], 0),
            Err(varint::VarintError::Truncated)
        );
        let too_long = [0xFFu8; 11];
        assert_eq!(
            varint::decode(&too_long, 0),
            Err(varint::VarintError::Overflow)
        );
    }

    // ================
    // RLE encode/decode tests
    // ================

    #[test]
    fn test_encode_decode_empty() {
        let encoded = encode([0u8; 0]);
        assert!(encoded.is_empty());
        assert_eq!(decode(&encoded, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_zero_words_collapse_to_one_run() {
        let data = vec![0u8; 400];
        let encoded = encode(&data);
        // varint(100 << 2 | 1) is 2 bytes, plus the word itself
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode(&encoded, data.len()).unwrap(), data);
    }

    #[test]
    fn test_literal_then_run_then_literal() {
        let data = words(&[1, 2, 0, 0, 0, 3]);
        let encoded = encode(&data);
        // literal(2) + run(3) + literal(1)
        assert_eq!(encoded.len(), (1 + 8) + (1 + 4) + (1 + 4));
        assert_eq!(decode(&encoded, data.len()).unwrap(), data);
    }

    #[test]
    fn test_single_repeat_stays_literal() {
        let data = words(&[5, 6, 5, 6]);
        let encoded = encode(&data);
        assert_eq!(encoded.len(), 1 + 16);
    }

    #[test]
    fn test_unaligned_tail_roundtrip() {
        for extra in 1..4 {
            let mut data = words(&[0, 0, 0, 9]);
            data.extend((0..extra).map(|b| b as u8 + 0xA0));
            let encoded = encode(&data);
            assert_eq!(decode(&encoded, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn test_only_tail() {
        let data = vec![7u8, 8];
        let encoded = encode(&data);
        assert_eq!(encoded, vec![(2 << 2) | 2, 7, 8]);
        assert_eq!(decode(&encoded, 2).unwrap(), data);
    }

    #[test]
    fn test_encoded_len_matches_actual() {
        let cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![1],
            words(&[0; 40]),
            words(&[1, 2, 3]),
            (0..=255).collect(),
            words(&[0, 0, 1, 1, 2, 2, 3]),
        ];
        for data in cases {
            assert_eq!(encoded_len(&data), encode(&data).len(), "data {:?}", data);
        }
    }

    #[test]
    fn test_incompressible_input_fits_max_encoded_len() {
        // mostly literal input, with and without a byte tail
        for len in [0usize, 1, 4, 5, 52, 2047, 2048, 65_504] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8 ^ (i / 251) as u8).collect();
            let encoded = encode(&data);
            assert!(
                encoded.len() <= max_encoded_len(len),
                "len {len}: {} > {}",
                encoded.len(),
                max_encoded_len(len)
            );
        }
        // one header byte over the input for a short literal
        let data = words(&[1, 3, 2, 9, 3, 20, 0, 1, 16, 1, 32, 1, 64]);
        assert_eq!(encoded_len(&data), data.len() + 1);
    }

    #[test]
    fn test_decode_into_tracks_offset_across_segments() {
        let data = words(&[4, 4, 4, 8, 9, 0, 0]);
        let mut encoded = encode(&data);
        // run(3) + literal(2) + run(2) + tail(1)
        encoded.extend_from_slice(&[(1 << 2) | 2, 0xEE]);
        let mut dst = [0xFFu8; 40];
        assert_eq!(decode_into(&encoded, 40, &mut dst).unwrap(), 29);
        assert_eq!(&dst[..28], &data[..]);
        assert_eq!(dst[28], 0xEE);
        assert!(dst[29..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_encode_into_exact_capacity() {
        let data = words(&[1, 2, 3, 0, 0, 0, 0]);
        let needed = encoded_len(&data);
        let mut dst = vec![0u8; needed];
        assert_eq!(encode_into(&data, &mut dst).unwrap(), needed);
    }

    #[test]
    fn test_encode_into_overflow_reports_required() {
        let data: Vec<u8> = (1..=64).collect();
        let mut dst = [0u8; 16];
        let err = encode_into(&data, &mut dst).unwrap_err();
        assert_eq!(
            err,
            TicwireError::EncodeOverflow {
                required: encoded_len(&data),
                capacity: 16,
                unit: SizeUnit::Bytes,
            }
        );
    }

    #[test]
    fn test_decode_respects_original_len() {
        let data = words(&[0; 8]);
        let encoded = encode(&data);
        let err = decode(&encoded, data.len() - 4).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::RleSegmentOverrun { end: 32, limit: 28, .. }
            }
        ));
    }

    #[test]
    fn test_decode_shorter_than_original_len_returns_written() {
        let data = words(&[1, 2]);
        let encoded = encode(&data);
        let mut dst = [0u8; 64];
        assert_eq!(decode_into(&encoded, 64, &mut dst).unwrap(), 8);
        assert_eq!(&dst[..8], &data[..]);
    }

    #[test]
    fn test_decode_destination_too_small() {
        let mut dst = [0u8; 4];
        let err = decode_into(&[], 8, &mut dst).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::OversizedInput { len: 8, capacity: 4 }
            }
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let data = words(&[1, 2, 3]);
        let encoded = encode(&data);
        let err = decode(&encoded[..encoded.len() - 1], data.len()).unwrap_err();
        assert!(matches!(err, TicwireError::DecodeTruncated { .. }));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let err = decode([(1u8 << 2) | 3, 0, 0, 0, 0], 16).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::RleUnknownTag { offset: 0, tag: 3 }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_segment_after_tail() {
        let bad = [(1u8 << 2) | 2, 0xAA, (1 << 2) | 1, 0, 0, 0, 0];
        let err = decode(bad, 16).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::RleMalformedTail { .. }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_tail() {
        let bad = [(4u8 << 2) | 2, 1, 2, 3, 4];
        assert!(decode(bad, 16).is_err());
    }

    #[test]
    fn test_decode_huge_run_count_does_not_allocate() {
        let mut bad = Vec::new();
        let mut header = [0u8; varint::MAX_LEN];
        let n = varint::encode((u64::MAX >> 2) << 2 | TAG_RUN, &mut header);
        bad.extend_from_slice(&header[..n]);
        bad.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            decode(&bad, 2048),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::RleSegmentOverrun { .. }
            })
        ));
    }

    #[test]
    fn test_roundtrip_patterns() {
        let patterns: Vec<Vec<u8>> = vec![
            words(&[0, 0, 0, 1, 0, 0, 0]),
            words(&[u32::MAX, u32::MAX, 0, 0, u32::MAX]),
            words(&[1, 0, 0, 0, 0, 0, 0, 0, 1]),
            (0..255).collect(),
            vec![0; 9],
        ];
        for (i, pattern) in patterns.iter().enumerate() {
            let encoded = encode(pattern);
            assert_eq!(
                &decode(&encoded, pattern.len()).unwrap(),
                pattern,
                "pattern {} failed roundtrip",
                i
            );
        }
    }
}
