//! Configuration types for codecs, the prediction window and the verifier.
//!
//! # Overview
//!
//! | Config Type | Purpose | Key Presets |
//! |-------------|---------|-------------|
//! | `WireConfig` | Packet codec buffers and compression | `uncompressed()`, `debug()` |
//! | `PredictionConfig` | How far ahead a client may simulate | `lan()`, `high_latency()` |
//! | `VerifierConfig` | What the determinism verifier compares | `full_state()`, `disabled()` |
//! | `NetConfig` | All of the above | `debug()` |
//!
//! Both peers of a session must agree on [`WireConfig::compression`] and
//! [`WireConfig::debug_trailer`]; neither is signalled on the wire.
//!
//! # Example
//!
//! ```
//! use ticwire::{CompressionMode, NetConfig, WireConfig};
//!
//! let config = NetConfig {
//!     wire: WireConfig::with_capacity_bytes(4096),
//!     ..NetConfig::default()
//! };
//! assert_eq!(config.wire.capacity_words, 1024);
//! assert_eq!(config.wire.compression, CompressionMode::Rle);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigReason;
use crate::rle::WORD_BYTES;
use crate::{Result, TicwireError};

/// Default scratch capacity: 512 words, 2048 bytes.
pub const DEFAULT_CAPACITY_WORDS: usize = 512;

/// Smallest capacity that can hold the fixed packet header.
pub const MIN_CAPACITY_WORDS: usize = 7;

/// Largest capacity accepted; a UDP payload cannot exceed 65507 bytes.
pub const MAX_CAPACITY_WORDS: usize = 65_507 / WORD_BYTES;

/// Whether encoded packets pass through the run-length codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionMode {
    /// Raw little-endian words.
    None,
    /// Word-granular run-length encoding.
    #[default]
    Rle,
}

/// Configuration of a [`PacketCodec`](crate::PacketCodec).
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Use the
/// `..WireConfig::default()` pattern when constructing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use = "WireConfig has no effect unless passed to PacketCodec::new()"]
pub struct WireConfig {
    /// Compression of the encoded word stream.
    ///
    /// Default: [`CompressionMode::Rle`]
    pub compression: CompressionMode,

    /// Capacity of the word scratch buffer. Bounds both the largest packet
    /// this codec encodes and the largest it accepts.
    ///
    /// Any packet that fits the word buffer also encodes under
    /// [`CompressionMode::Rle`]: run-length output for incompressible words
    /// is a few bytes longer than [`capacity_bytes`](Self::capacity_bytes),
    /// at most [`rle::max_encoded_len`](crate::rle::max_encoded_len) of it,
    /// and the decoder accepts up to that length.
    ///
    /// Default: [`DEFAULT_CAPACITY_WORDS`]
    pub capacity_words: usize,

    /// Append the debug trailer carrying [`Packet::debug`](crate::Packet::debug).
    ///
    /// Default: `false`
    pub debug_trailer: bool,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMode::Rle,
            capacity_words: DEFAULT_CAPACITY_WORDS,
            debug_trailer: false,
        }
    }
}

impl WireConfig {
    /// Creates a new `WireConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw words, no compression pass.
    pub fn uncompressed() -> Self {
        Self {
            compression: CompressionMode::None,
            ..Self::default()
        }
    }

    /// Debug trailer enabled with a capacity large enough for full-state payloads.
    pub fn debug() -> Self {
        Self {
            capacity_words: DEFAULT_CAPACITY_WORDS * 8,
            debug_trailer: true,
            ..Self::default()
        }
    }

    /// Default configuration with the capacity given in bytes, rounded down to whole words.
    pub fn with_capacity_bytes(bytes: usize) -> Self {
        Self {
            capacity_words: bytes / WORD_BYTES,
            ..Self::default()
        }
    }

    /// Capacity of the scratch buffers in bytes.
    #[must_use]
    pub const fn capacity_bytes(&self) -> usize {
        self.capacity_words * WORD_BYTES
    }

    /// Validates the wire configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TicwireError::InvalidConfig`] if `capacity_words` is outside
    /// `MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS`.
    pub fn validate(&self) -> Result<()> {
        if self.capacity_words < MIN_CAPACITY_WORDS {
            return Err(TicwireError::InvalidConfig {
                reason: ConfigReason::CapacityTooSmall {
                    capacity_words: self.capacity_words,
                    min_words: MIN_CAPACITY_WORDS,
                },
            });
        }
        if self.capacity_words > MAX_CAPACITY_WORDS {
            return Err(TicwireError::InvalidConfig {
                reason: ConfigReason::CapacityTooLarge {
                    capacity_words: self.capacity_words,
                    max_words: MAX_CAPACITY_WORDS,
                },
            });
        }
        Ok(())
    }
}

/// Configuration of the [`PredictionWindow`](crate::PredictionWindow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use = "PredictionConfig has no effect unless passed to PredictionWindow::new()"]
pub struct PredictionConfig {
    /// Authoritative tic rate in Hz.
    ///
    /// Default: 30
    pub net_frequency: u32,

    /// Upper bound on tics simulated past the last confirmed tic. Zero
    /// disables prediction.
    ///
    /// Default: 8
    pub max_prediction_tics: u32,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            net_frequency: 30,
            max_prediction_tics: 8,
        }
    }
}

impl PredictionConfig {
    /// Creates a new `PredictionConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short window for local networks.
    pub fn lan() -> Self {
        Self {
            max_prediction_tics: 3,
            ..Self::default()
        }
    }

    /// Wide window for connections with several hundred milliseconds of latency.
    pub fn high_latency() -> Self {
        Self {
            max_prediction_tics: 15,
            ..Self::default()
        }
    }

    /// Validates the prediction configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TicwireError::InvalidConfig`] if `net_frequency` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.net_frequency == 0 {
            return Err(TicwireError::InvalidConfig {
                reason: ConfigReason::ZeroNetFrequency,
            });
        }
        Ok(())
    }
}

/// Configuration of the [`DeterminismVerifier`](crate::DeterminismVerifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use = "VerifierConfig has no effect unless passed to DeterminismVerifier::new()"]
pub struct VerifierConfig {
    /// Attach debug payloads to outgoing packets and check incoming ones.
    ///
    /// Default: `true`
    pub enabled: bool,

    /// Capture, send and compare full actor state in addition to counters.
    ///
    /// Default: `false`
    pub full_state: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            full_state: false,
        }
    }
}

impl VerifierConfig {
    /// Creates a new `VerifierConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters and full actor state.
    pub fn full_state() -> Self {
        Self {
            enabled: true,
            full_state: true,
        }
    }

    /// No payloads are attached or checked.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            full_state: false,
        }
    }

    /// Validates the verifier configuration. Every combination is accepted.
    ///
    /// # Errors
    ///
    /// Never fails; present for symmetry with the other configs.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Aggregate configuration of one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[must_use]
pub struct NetConfig {
    /// Packet codec settings.
    pub wire: WireConfig,
    /// Prediction window settings.
    pub prediction: PredictionConfig,
    /// Determinism verifier settings.
    pub verifier: VerifierConfig,
}

impl NetConfig {
    /// Debug trailer on the wire and full-state verification.
    pub fn debug() -> Self {
        Self {
            wire: WireConfig::debug(),
            verifier: VerifierConfig::full_state(),
            ..Self::default()
        }
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`TicwireError::InvalidConfig`] found.
    pub fn validate(&self) -> Result<()> {
        self.wire.validate()?;
        self.prediction.validate()?;
        self.verifier.validate()
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
    fn test_defaults() {
        let wire = WireConfig::default();
        assert_eq!(wire.compression, CompressionMode::Rle);
        assert_eq!(wire.capacity_bytes(), 2048);
        assert!(!wire.debug_trailer);

        let prediction = PredictionConfig::default();
        assert_eq!(prediction.net_frequency, 30);
        assert_eq!(prediction.max_prediction_tics, 8);
    }

    #[test]
    fn test_presets_validate() {
        let configs = [
            WireConfig::new(),
            WireConfig::uncompressed(),
            WireConfig::debug(),
            WireConfig::with_capacity_bytes(1500),
        ];
        for config in configs {
            assert!(config.validate().is_ok(), "{config:?}");
        }
        assert!(PredictionConfig::lan().validate().is_ok());
        assert!(PredictionConfig::high_latency().validate().is_ok());
        assert!(NetConfig::debug().validate().is_ok());
    }

    #[test]
    fn test_capacity_bounds() {
        let exact = WireConfig {
            capacity_words: MIN_CAPACITY_WORDS,
            ..WireConfig::default()
        };
        assert!(exact.validate().is_ok());

        let small = WireConfig {
            capacity_words: MIN_CAPACITY_WORDS - 1,
            ..WireConfig::default()
        };
        assert!(matches!(
            small.validate(),
            Err(TicwireError::InvalidConfig {
                reason: ConfigReason::CapacityTooSmall { min_words: 7, .. }
            })
        ));

        let large = WireConfig {
            capacity_words: MAX_CAPACITY_WORDS + 1,
            ..WireConfig::default()
        };
        assert!(matches!(
            large.validate(),
            Err(TicwireError::InvalidConfig {
                reason: ConfigReason::CapacityTooLarge { .. }
            })
        ));
    }

    #[test]
    fn test_with_capacity_bytes_rounds_down() {
        assert_eq!(WireConfig::with_capacity_bytes(1501).capacity_words, 375);
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let config = NetConfig {
            prediction: PredictionConfig {
                net_frequency: 0,
                ..PredictionConfig::default()
            },
            ..NetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TicwireError::InvalidConfig {
                reason: ConfigReason::ZeroNetFrequency
            })
        ));
    }

    #[test]
    fn test_verifier_presets() {
        assert!(VerifierConfig::default().enabled);
        assert!(!VerifierConfig::default().full_state);
        assert!(VerifierConfig::full_state().full_state);
        assert!(!VerifierConfig::disabled().enabled);
    }
}
