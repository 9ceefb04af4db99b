//! Fixed-capacity scratch arena owned by a [`PacketCodec`](crate::PacketCodec).
//!
//! Words are stored in little-endian byte order so that the `u8` view
//! produced by [`bytemuck`] is already the wire representation on every host.

use crate::error::{CorruptReason, SizeUnit, TicwireError};
use crate::rle::{self, WORD_BYTES};
use crate::Result;

/// Scratch buffers reused across every encode and decode of one codec.
#[derive(Debug, Clone)]
pub struct WireBuffers {
    words: Vec<u32>,
    bytes: Vec<u8>,
    pub(crate) order: Vec<usize>,
    pub(crate) trailer: Vec<u8>,
}

impl WireBuffers {
    /// Allocates buffers for `capacity_words` words.
    ///
    /// The compression buffer holds the worst-case run-length encoding of a
    /// full word buffer, see [`rle::max_encoded_len`].
    #[must_use]
    pub fn new(capacity_words: usize) -> Self {
        Self {
            words: vec![0; capacity_words],
            bytes: vec![0; rle::max_encoded_len(capacity_words * WORD_BYTES)],
            order: Vec::new(),
            trailer: Vec::new(),
        }
    }

    /// Capacity of the word buffer.
    #[must_use]
    pub fn capacity_words(&self) -> usize {
        self.words.len()
    }

    /// Capacity of the word buffer in bytes.
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Capacity of the compression buffer, the largest run-length encoded
    /// input [`decompress`](Self::decompress) accepts.
    #[must_use]
    pub fn compressed_capacity(&self) -> usize {
        self.bytes.len()
    }

    /// A writer over the whole word buffer.
    pub fn writer(&mut self) -> WordWriter<'_> {
        WordWriter {
            words: &mut self.words,
            pos: 0,
        }
    }

    /// A writer over the word buffer together with the sort index and the
    /// serialized trailer, which encoding reads while it writes.
    pub(crate) fn writer_with_scratch(&mut self) -> (WordWriter<'_>, &[usize], &[u8]) {
        (
            WordWriter {
                words: &mut self.words,
                pos: 0,
            },
            &self.order,
            &self.trailer,
        )
    }

    /// A reader over the first `len` words.
    #[must_use]
    pub fn reader(&self, len: usize) -> WordReader<'_> {
        WordReader {
            words: &self.words[..len.min(self.words.len())],
            pos: 0,
        }
    }

    /// The first `len` words as wire bytes.
    #[must_use]
    pub fn word_bytes(&self, len: usize) -> &[u8] {
        bytemuck::cast_slice(&self.words[..len.min(self.words.len())])
    }

    /// The first `len` bytes of the compression buffer.
    #[must_use]
    pub fn compressed(&self, len: usize) -> &[u8] {
        &self.bytes[..len.min(self.bytes.len())]
    }

    /// Run-length encodes the first `word_len` words into the byte buffer.
    ///
    /// # Errors
    ///
    /// [`TicwireError::EncodeOverflow`] in bytes if the compressed form does
    /// not fit the byte buffer. The buffer holds the worst case of a full
    /// word buffer.
    pub fn compress(&mut self, word_len: usize) -> Result<usize> {
        let src: &[u8] = bytemuck::cast_slice(&self.words[..word_len.min(self.words.len())]);
        rle::encode_into(src, &mut self.bytes)
    }

    /// Copies raw wire bytes into the word buffer, returning the word count.
    ///
    /// # Errors
    ///
    /// [`TicwireError::DecodeCorrupt`] if `src` exceeds the capacity or is not
    /// a whole number of words.
    pub fn load_words(&mut self, src: &[u8]) -> Result<usize> {
        if src.len() > self.capacity_bytes() {
            return Err(TicwireError::corrupt(CorruptReason::OversizedInput {
                len: src.len(),
                capacity: self.capacity_bytes(),
            }));
        }
        if src.len() % WORD_BYTES != 0 {
            return Err(TicwireError::corrupt(CorruptReason::MisalignedLength {
                len: src.len(),
            }));
        }
        let word_len = src.len() / WORD_BYTES;
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words[..word_len]);
        dst.copy_from_slice(src);
        Ok(word_len)
    }

    /// Run-length decodes `src` into the word buffer, returning the word count.
    ///
    /// # Errors
    ///
    /// Any error of [`rle::decode_into`], plus [`TicwireError::DecodeCorrupt`]
    /// if `src` exceeds the compression buffer, the decoded length exceeds
    /// the word buffer, or the decoded length is not a whole number of words.
    pub fn decompress(&mut self, src: &[u8]) -> Result<usize> {
        let compressed_capacity = self.compressed_capacity();
        if src.len() > compressed_capacity {
            return Err(TicwireError::corrupt(CorruptReason::OversizedInput {
                len: src.len(),
                capacity: compressed_capacity,
            }));
        }
        let capacity = self.capacity_bytes();
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words[..]);
        let len = rle::decode_into(src, capacity, dst)?;
        if len % WORD_BYTES != 0 {
            return Err(TicwireError::corrupt(CorruptReason::MisalignedLength {
                len,
            }));
        }
        Ok(len / WORD_BYTES)
    }
}

/// Appends words to a [`WireBuffers`] word buffer.
#[derive(Debug)]
pub struct WordWriter<'a> {
    words: &'a mut [u32],
    pos: usize,
}

impl WordWriter<'_> {
    /// Words written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pos
    }

    /// Returns `true` if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Appends one word.
    ///
    /// # Errors
    ///
    /// [`TicwireError::EncodeOverflow`] in words if the buffer is full.
    pub fn push(&mut self, value: u32) -> Result<()> {
        let capacity = self.words.len();
        let slot = self
            .words
            .get_mut(self.pos)
            .ok_or(TicwireError::EncodeOverflow {
                required: self.pos + 1,
                capacity,
                unit: SizeUnit::Words,
            })?;
        *slot = value.to_le();
        self.pos += 1;
        Ok(())
    }

    /// Appends a float by bit pattern.
    pub fn push_f32(&mut self, value: f32) -> Result<()> {
        self.push(value.to_bits())
    }

    /// Appends a boolean as `0` or `1`.
    pub fn push_bool(&mut self, value: bool) -> Result<()> {
        self.push(u32::from(value))
    }

    /// Appends bytes, zero padding the last word.
    pub fn push_padded(&mut self, bytes: &[u8]) -> Result<()> {
        for chunk in bytes.chunks(WORD_BYTES) {
            let mut word = [0u8; WORD_BYTES];
            word[..chunk.len()].copy_from_slice(chunk);
            self.push(u32::from_le_bytes(word))?;
        }
        Ok(())
    }
}

/// Reads words from a [`WireBuffers`] word buffer.
#[derive(Debug)]
pub struct WordReader<'a> {
    words: &'a [u32],
    pos: usize,
}

impl<'a> WordReader<'a> {
    /// Offset of the next word.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Words left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    fn truncated(&self, needed: usize) -> TicwireError {
        TicwireError::DecodeTruncated {
            needed: self.pos + needed,
            available: self.words.len(),
            unit: SizeUnit::Words,
        }
    }

    /// Reads one word.
    ///
    /// # Errors
    ///
    /// [`TicwireError::DecodeTruncated`] at the end of the buffer.
    pub fn next_u32(&mut self) -> Result<u32> {
        let word = *self.words.get(self.pos).ok_or(self.truncated(1))?;
        self.pos += 1;
        Ok(u32::from_le(word))
    }

    /// Reads a float by bit pattern.
    pub fn next_f32(&mut self) -> Result<f32> {
        self.next_u32().map(f32::from_bits)
    }

    /// Reads a boolean word.
    ///
    /// # Errors
    ///
    /// [`TicwireError::DecodeCorrupt`] if the word is neither `0` nor `1`.
    pub fn next_bool(&mut self) -> Result<bool> {
        let offset = self.pos;
        match self.next_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(TicwireError::corrupt(CorruptReason::InvalidBool {
                offset,
                value,
            })),
        }
    }

    /// Reads `byte_len` bytes spanning `ceil(byte_len / 4)` padded words.
    ///
    /// # Errors
    ///
    /// [`TicwireError::DecodeTruncated`] if fewer words remain.
    pub fn next_padded(&mut self, byte_len: usize) -> Result<&'a [u8]> {
        let word_len = byte_len.div_ceil(WORD_BYTES);
        if word_len > self.remaining() {
            return Err(self.truncated(word_len));
        }
        let words = &self.words[self.pos..self.pos + word_len];
        self.pos += word_len;
        let bytes: &'a [u8] = bytemuck::cast_slice(words);
        Ok(&bytes[..byte_len])
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_word_bytes_are_little_endian() {
        let mut buffers = WireBuffers::new(4);
        let mut writer = buffers.writer();
        writer.push(0x0403_0201).unwrap();
        writer.push_bool(true).unwrap();
        let len = writer.len();
        assert_eq!(buffers.word_bytes(len), &[1, 2, 3, 4, 1, 0, 0, 0]);
    }

    #[test]
    fn test_writer_overflow() {
        let mut buffers = WireBuffers::new(2);
        let mut writer = buffers.writer();
        writer.push(1).unwrap();
        writer.push(2).unwrap();
        assert_eq!(
            writer.push(3),
            Err(TicwireError::EncodeOverflow {
                required: 3,
                capacity: 2,
                unit: SizeUnit::Words,
            })
        );
    }

    #[test]
    fn test_padded_bytes_roundtrip() {
        let mut buffers = WireBuffers::new(8);
        let mut writer = buffers.writer();
        writer.push_padded(b"hello").unwrap();
        writer.push(9).unwrap();
        assert_eq!(writer.len(), 3);

        let mut reader = buffers.reader(3);
        assert_eq!(reader.next_padded(5).unwrap(), b"hello");
        assert_eq!(reader.next_u32().unwrap(), 9);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_truncated_and_bool() {
        let mut buffers = WireBuffers::new(2);
        buffers.load_words(&[2, 0, 0, 0]).unwrap();
        let mut reader = buffers.reader(1);
        assert!(matches!(
            reader.next_bool(),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::InvalidBool {
                    offset: 0,
                    value: 2
                }
            })
        ));
        assert!(matches!(
            reader.next_u32(),
            Err(TicwireError::DecodeTruncated {
                needed: 2,
                available: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_load_words_rejects_bad_lengths() {
        let mut buffers = WireBuffers::new(2);
        assert!(matches!(
            buffers.load_words(&[0; 5]),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::MisalignedLength { len: 5 }
            })
        ));
        assert!(matches!(
            buffers.load_words(&[0; 12]),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::OversizedInput { .. }
            })
        ));
    }

    #[test]
    fn test_compress_decompress() {
        let mut buffers = WireBuffers::new(16);
        let mut writer = buffers.writer();
        for _ in 0..10 {
            writer.push(0).unwrap();
        }
        writer.push(7).unwrap();
        let len = writer.len();
        let compressed_len = buffers.compress(len).unwrap();
        let compressed = buffers.compressed(compressed_len).to_vec();
        assert!(compressed.len() < len * WORD_BYTES);

        let mut other = WireBuffers::new(16);
        assert_eq!(other.decompress(&compressed).unwrap(), len);
        let mut reader = other.reader(len);
        for _ in 0..10 {
            assert_eq!(reader.next_u32().unwrap(), 0);
        }
        assert_eq!(reader.next_u32().unwrap(), 7);
    }

    #[test]
    fn test_full_incompressible_buffer_compresses() {
        let mut buffers = WireBuffers::new(32);
        let mut writer = buffers.writer();
        for i in 0..32 {
            writer.push(i * 3 + 1).unwrap();
        }
        let compressed_len = buffers.compress(32).unwrap();
        assert!(compressed_len > buffers.capacity_bytes());
        assert!(compressed_len <= buffers.compressed_capacity());
        let compressed = buffers.compressed(compressed_len).to_vec();

        let mut other = WireBuffers::new(32);
        assert_eq!(other.decompress(&compressed).unwrap(), 32);
        assert_eq!(other.word_bytes(32), buffers.word_bytes(32));

        let oversized = vec![0u8; other.compressed_capacity() + 1];
        assert!(matches!(
            other.decompress(&oversized),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::OversizedInput { .. }
            })
        ));
    }

    #[test]
    fn test_decompress_rejects_byte_tail() {
        let compressed = rle::encode([1u8, 2, 3, 4, 5]);
        let mut buffers = WireBuffers::new(4);
        assert!(matches!(
            buffers.decompress(&compressed),
            Err(TicwireError::DecodeCorrupt {
                reason: CorruptReason::MisalignedLength { len: 5 }
            })
        ));
    }
}
