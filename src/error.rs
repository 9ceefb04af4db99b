//! Error types returned by the codec and configuration layers.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{ClientId, Tic};

/// Unit in which a buffer size is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeUnit {
    /// 32-bit wire words.
    Words,
    /// Raw bytes.
    Bytes,
}

impl Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Words => f.write_str("words"),
            Self::Bytes => f.write_str("bytes"),
        }
    }
}

/// Why a received buffer was rejected as corrupt.
///
/// Offsets are word offsets into the decoded word stream unless the variant
/// belongs to the run-length layer, where they are byte offsets into the
/// compressed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CorruptReason {
    /// The input is larger than the codec's scratch capacity.
    OversizedInput {
        /// Length of the received buffer.
        len: usize,
        /// Scratch capacity in the same unit.
        capacity: usize,
    },
    /// An uncompressed buffer whose length is not a whole number of words.
    MisalignedLength {
        /// Length of the received buffer in bytes.
        len: usize,
    },
    /// `events_count` claims more entries than the scratch buffer could hold.
    EventCountOutOfBounds {
        /// The decoded count.
        count: u32,
        /// Scratch capacity in words.
        capacity_words: usize,
    },
    /// `actor_count` claims more actors than the scratch buffer could hold.
    ActorCountOutOfBounds {
        /// The decoded count.
        count: u32,
        /// Scratch capacity in words.
        capacity_words: usize,
    },
    /// `first_tic + events_count` does not fit in a tic.
    TicRangeOverflow {
        /// First tic of the event range.
        first_tic: u32,
        /// Number of entries in the range.
        count: u32,
    },
    /// An event flags word carries bits outside the known set.
    UnknownEventFlags {
        /// Tic of the offending entry.
        tic: Tic,
        /// The raw flags word.
        flags: u32,
    },
    /// A boolean slot holds something other than 0 or 1.
    InvalidBool {
        /// Word offset of the slot.
        offset: usize,
        /// The raw value.
        value: u32,
    },
    /// A snapshot actor names an actor kind this build does not know.
    UnknownActorKind {
        /// Word offset of the slot.
        offset: usize,
        /// The raw value.
        value: u32,
    },
    /// Words remain after the last section of the layout.
    TrailingWords {
        /// Number of unread words.
        remaining: usize,
    },
    /// A run-length segment header carries an unknown tag.
    RleUnknownTag {
        /// Byte offset of the header.
        offset: usize,
        /// The tag bits.
        tag: u8,
    },
    /// A run-length segment would write past the decode limit.
    RleSegmentOverrun {
        /// Byte offset of the header.
        offset: usize,
        /// Decoded length the segment would reach.
        end: usize,
        /// The decode limit.
        limit: usize,
    },
    /// A run-length varint header does not terminate within 64 bits.
    RleVarintOverflow {
        /// Byte offset of the header.
        offset: usize,
    },
    /// A byte-tail segment is longer than a word, or is not the final segment.
    RleMalformedTail {
        /// Byte offset of the header.
        offset: usize,
        /// Number of tail bytes claimed.
        count: usize,
    },
    /// The debug trailer is longer than its word span or fails to deserialize.
    InvalidDebugTrailer {
        /// Claimed byte length of the trailer.
        byte_len: u32,
    },
}

impl Display for CorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OversizedInput { len, capacity } => {
                write!(f, "input of {} exceeds scratch capacity {}", len, capacity)
            },
            Self::MisalignedLength { len } => {
                write!(f, "length {} bytes is not a multiple of 4", len)
            },
            Self::EventCountOutOfBounds {
                count,
                capacity_words,
            } => write!(
                f,
                "events_count {} exceeds scratch capacity of {} words",
                count, capacity_words
            ),
            Self::ActorCountOutOfBounds {
                count,
                capacity_words,
            } => write!(
                f,
                "actor_count {} exceeds scratch capacity of {} words",
                count, capacity_words
            ),
            Self::TicRangeOverflow { first_tic, count } => {
                write!(f, "tic range {}+{} overflows", first_tic, count)
            },
            Self::UnknownEventFlags { tic, flags } => {
                write!(f, "unknown event flags {:#x} at tic {}", flags, tic)
            },
            Self::InvalidBool { offset, value } => {
                write!(f, "boolean word {} at offset {}", value, offset)
            },
            Self::UnknownActorKind { offset, value } => {
                write!(f, "unknown actor kind {} at offset {}", value, offset)
            },
            Self::TrailingWords { remaining } => {
                write!(f, "{} trailing words after packet end", remaining)
            },
            Self::RleUnknownTag { offset, tag } => {
                write!(f, "unknown RLE segment tag {} at byte {}", tag, offset)
            },
            Self::RleSegmentOverrun { offset, end, limit } => write!(
                f,
                "RLE segment at byte {} reaches {} past limit {}",
                offset, end, limit
            ),
            Self::RleVarintOverflow { offset } => {
                write!(f, "RLE header at byte {} overflows 64 bits", offset)
            },
            Self::RleMalformedTail { offset, count } => {
                write!(f, "malformed RLE byte tail of {} at byte {}", count, offset)
            },
            Self::InvalidDebugTrailer { byte_len } => {
                write!(f, "invalid debug trailer of {} bytes", byte_len)
            },
        }
    }
}

/// Why a caller-supplied value was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvalidRequestKind {
    /// Two events of one packet claim the same tic.
    DuplicateEventTic {
        /// The shared tic.
        tic: Tic,
        /// Client of the second event, if it named one.
        client: Option<ClientId>,
    },
    /// The event range of a packet does not fit in a `u32` count.
    EventRangeTooWide {
        /// First tic of the range.
        first: Tic,
        /// Last tic of the range.
        last: Tic,
    },
}

impl Display for InvalidRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEventTic { tic, client } => match client {
                Some(client) => write!(f, "duplicate event at tic {} (client {})", tic, client),
                None => write!(f, "duplicate event at tic {}", tic),
            },
            Self::EventRangeTooWide { first, last } => {
                write!(f, "event range {}..={} is too wide", first, last)
            },
        }
    }
}

/// Why a configuration value was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ConfigReason {
    /// The scratch capacity cannot hold even a packet header.
    CapacityTooSmall {
        /// Requested capacity in words.
        capacity_words: usize,
        /// Smallest accepted capacity in words.
        min_words: usize,
    },
    /// The scratch capacity exceeds what the codec accepts.
    CapacityTooLarge {
        /// Requested capacity in words.
        capacity_words: usize,
        /// Largest accepted capacity in words.
        max_words: usize,
    },
    /// A network frequency of zero would never permit prediction.
    ZeroNetFrequency,
}

impl Display for ConfigReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityTooSmall {
                capacity_words,
                min_words,
            } => write!(
                f,
                "capacity of {} words is below the minimum of {}",
                capacity_words, min_words
            ),
            Self::CapacityTooLarge {
                capacity_words,
                max_words,
            } => write!(
                f,
                "capacity of {} words is above the maximum of {}",
                capacity_words, max_words
            ),
            Self::ZeroNetFrequency => f.write_str("net frequency must be at least 1 Hz"),
        }
    }
}

/// This enum contains all error messages this library can return. Most API functions will generally return a [`Result<T, TicwireError>`].
///
/// A divergence between peers is not an error; it is reported through
/// [`crate::telemetry`] instead.
///
/// [`Result<T, TicwireError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TicwireError {
    /// The serialized packet does not fit the scratch buffer. Nothing is sent;
    /// the caller must enlarge the capacity or split the packet.
    EncodeOverflow {
        /// Size the encoding needs, or the first size that did not fit.
        required: usize,
        /// Capacity of the destination.
        capacity: usize,
        /// Unit of both sizes.
        unit: SizeUnit,
    },
    /// The received buffer ends before a required field.
    DecodeTruncated {
        /// Size needed to read the next field.
        needed: usize,
        /// Size actually available.
        available: usize,
        /// Unit of both sizes.
        unit: SizeUnit,
    },
    /// The received buffer is malformed. The packet must be discarded.
    DecodeCorrupt {
        /// Further specifies what was wrong.
        reason: CorruptReason,
    },
    /// You made an invalid request, usually by passing a malformed packet to encode.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        kind: InvalidRequestKind,
    },
    /// A configuration value is out of range.
    InvalidConfig {
        /// Further specifies which constraint was violated.
        reason: ConfigReason,
    },
    /// Serialization of the debug trailer failed.
    Serialization {
        /// A description of what failed to serialize.
        context: String,
    },
}

impl TicwireError {
    /// Returns `true` for the errors a receiver sees on a bad packet.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::DecodeTruncated { .. } | Self::DecodeCorrupt { .. }
        )
    }

    pub(crate) const fn corrupt(reason: CorruptReason) -> Self {
        Self::DecodeCorrupt { reason }
    }
}

impl Display for TicwireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicwireError::EncodeOverflow {
                required,
                capacity,
                unit,
            } => {
                write!(
                    f,
                    "Encode overflow: needed {} {}, capacity is {} {}",
                    required, unit, capacity, unit
                )
            },
            TicwireError::DecodeTruncated {
                needed,
                available,
                unit,
            } => {
                write!(
                    f,
                    "Truncated packet: needed {} {}, only {} available",
                    needed, unit, available
                )
            },
            TicwireError::DecodeCorrupt { reason } => {
                write!(f, "Corrupt packet: {}", reason)
            },
            TicwireError::InvalidRequest { kind } => {
                write!(f, "Invalid Request: {}", kind)
            },
            TicwireError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            },
            TicwireError::Serialization { context } => {
                write!(f, "Serialization error: {}", context)
            },
        }
    }
}

impl Error for TicwireError {}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, TicwireError>;

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
    fn test_display_encode_overflow() {
        let err = TicwireError::EncodeOverflow {
            required: 513,
            capacity: 512,
            unit: SizeUnit::Words,
        };
        let msg = err.to_string();
        assert!(msg.contains("513 words"));
        assert!(msg.contains("512 words"));
    }

    #[test]
    fn test_display_corrupt_reason() {
        let err = TicwireError::corrupt(CorruptReason::UnknownEventFlags {
            tic: Tic::new(7),
            flags: 0x10,
        });
        assert!(err.to_string().contains("0x10"));
        assert!(err.to_string().contains("tic 7"));
    }

    #[test]
    fn test_is_decode_error() {
        assert!(TicwireError::DecodeTruncated {
            needed: 4,
            available: 3,
            unit: SizeUnit::Words,
        }
        .is_decode_error());
        assert!(!TicwireError::InvalidConfig {
            reason: ConfigReason::ZeroNetFrequency,
        }
        .is_decode_error());
    }

    #[test]
    fn test_duplicate_tic_display_names_client() {
        let kind = InvalidRequestKind::DuplicateEventTic {
            tic: Tic::new(3),
            client: Some(ClientId::new(9)),
        };
        assert_eq!(kind.to_string(), "duplicate event at tic 3 (client 9)");
    }
}
