//! The bincode configuration used for the debug trailer is defined once here.
//! The trailer is the only part of a packet that is not laid out word by word;
//! everything it carries goes through [`encode_append`] and [`decode_exact`].
//!
//! # Examples
//!
//! ```
//! use ticwire::network::codec::{decode_exact, encode};
//! use ticwire::{DebugPayload, Tic};
//!
//! let payload = DebugPayload {
//!     tic: Tic::new(41),
//!     seed: 7,
//!     next_id: 3,
//!     ..DebugPayload::default()
//! };
//! let bytes = encode(&payload)?;
//! let decoded: DebugPayload = decode_exact(&bytes)?;
//! assert_eq!(decoded, payload);
//! # Ok::<(), ticwire::TicwireError>(())
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::error::{CorruptReason, TicwireError};
use crate::Result;

// Fixed-width integers: equal states encode to identical bytes on every peer.
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// What was being serialized when a codec error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecOperation {
    /// Encoding into a new buffer.
    Encode,
    /// Appending to a buffer.
    AppendToBuffer,
}

impl fmt::Display for CodecOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encoding debug trailer"),
            Self::AppendToBuffer => write!(f, "appending debug trailer"),
        }
    }
}

fn serialization_error(operation: CodecOperation, err: impl fmt::Display) -> TicwireError {
    TicwireError::Serialization {
        context: format!("{operation}: {err}"),
    }
}

/// Encodes a value into a new `Vec<u8>`.
///
/// # Errors
///
/// Returns [`TicwireError::Serialization`] if bincode refuses the value.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config())
        .map_err(|e| serialization_error(CodecOperation::Encode, e))
}

/// Encodes a value by appending to an existing `Vec<u8>`, returning the number
/// of bytes appended.
///
/// # Errors
///
/// Returns [`TicwireError::Serialization`] if bincode refuses the value.
pub fn encode_append<T: Serialize>(value: &T, buffer: &mut Vec<u8>) -> Result<usize> {
    bincode::serde::encode_into_std_write(value, buffer, config())
        .map_err(|e| serialization_error(CodecOperation::AppendToBuffer, e))
}

/// Decodes a value that must occupy all of `bytes`.
///
/// # Errors
///
/// Returns [`TicwireError::DecodeCorrupt`] with
/// [`CorruptReason::InvalidDebugTrailer`] if the bytes do not deserialize or
/// if bytes remain after the value.
pub fn decode_exact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let invalid = || {
        TicwireError::corrupt(CorruptReason::InvalidDebugTrailer {
            byte_len: u32::try_from(bytes.len()).unwrap_or(u32::MAX),
        })
    };
    let Ok((value, read)) = bincode::serde::decode_from_slice(bytes, config()) else {
        return Err(invalid());
    };
    if read != bytes.len() {
        return Err(invalid());
    }
    Ok(value)
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
    use crate::state::{ActorKind, ActorRecord, StateData};
    use crate::{DebugPayload, Tic};

    fn payload_with_state() -> DebugPayload {
        let mut state = StateData {
            next_id: 12,
            seed: 0xBEEF,
            map_seed: 99,
            tic: Tic::new(40),
            ..StateData::default()
        };
        state.actors_of_mut(ActorKind::Barrel).push(ActorRecord {
            kind: ActorKind::Barrel,
            x: 1.5,
            hp: 3,
            ..ActorRecord::default()
        });
        DebugPayload {
            tic: Tic::new(40),
            seed: 0xBEEF,
            next_id: 12,
            state: Some(state.clone()),
            final_state: Some(state),
        }
    }

    #[test]
    fn test_roundtrip_payload_with_state() {
        let original = payload_with_state();
        let bytes = encode(&original).unwrap();
        let decoded: DebugPayload = decode_exact(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_encode_append_reports_length() {
        let mut buffer = vec![0xAA; 3];
        let len = encode_append(&payload_with_state(), &mut buffer).unwrap();
        assert_eq!(buffer.len(), len + 3);
        assert_eq!(&buffer[..3], &[0xAA; 3]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode(&payload_with_state()).unwrap();
        let b = encode(&payload_with_state()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(&DebugPayload::default()).unwrap();
        bytes.push(0);
        let err = decode_exact::<DebugPayload>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::InvalidDebugTrailer { .. }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let bytes = encode(&payload_with_state()).unwrap();
        let result = decode_exact::<DebugPayload>(&bytes[..bytes.len() / 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_codec_operation_display() {
        assert!(CodecOperation::Encode.to_string().contains("encoding"));
        assert!(CodecOperation::AppendToBuffer
            .to_string()
            .contains("appending"));
    }
}
