//! # ticwire
//!
//! Network synchronization core for lockstep multiplayer simulations.
//!
//! Peers exchange per-tic input over an unreliable channel. Each [`Packet`]
//! carries the sender's input for a contiguous tic range, addressed
//! positionally so that a quiet tic costs one zero word, plus an optional
//! bootstrap [`Snapshot`]. The encoded word stream is optionally passed through
//! a word-granular run-length pass ([`rle`]).
//!
//! Alongside the codec the crate detects, but never corrects, divergence
//! between peers running the same deterministic simulation
//! ([`verify`]), and bounds how far a client may simulate ahead of the last
//! confirmed tic ([`prediction`]).
//!
//! ```
//! use ticwire::{ClientEvent, ClientId, Packet, PacketCodec, Tic, WireConfig};
//! use ticwire::buttons::{ButtonFlags, InputButtons};
//!
//! let mut codec = PacketCodec::new(WireConfig::default())?;
//! let packet = Packet {
//!     sender: ClientId::new(2),
//!     tic: Tic::new(120),
//!     events: vec![ClientEvent::buttons(Tic::new(118), InputButtons::from(ButtonFlags::JUMP))],
//!     ..Packet::default()
//! };
//! let bytes = codec.encode_to_vec(&packet)?;
//! let decoded = codec.decode(&bytes)?;
//! assert_eq!(decoded.tic, Tic::new(120));
//! # Ok::<(), ticwire::TicwireError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use config::{CompressionMode, NetConfig, PredictionConfig, VerifierConfig, WireConfig};
pub use error::{Result, TicwireError};
pub use network::packet::{ActorInit, ClientEvent, DebugPayload, Packet, Snapshot, Vec3};
pub use network::packet_codec::PacketCodec;
pub use prediction::{compute_ahead_tics, AheadTics, PredictionClock, PredictionWindow};
pub use state::{ActorKind, ActorRecord, StateCounters, StateData};
pub use verify::{
    compare_counters, compare_full_state, DeterminismVerifier, DivergenceKind, DivergenceReport,
};

pub mod buttons;
pub mod config;
pub mod error;
pub mod prediction;
pub mod prelude;
/// Word-granular run-length encoding of encoded packets.
///
/// See the module documentation for the segment format.
pub mod rle;
pub mod state;
pub mod telemetry;
pub mod verify;
pub mod network {
    //! Packet types and their binary codec.

    #[doc(hidden)]
    pub mod buffers;
    /// Binary codec for the debug trailer.
    ///
    /// Provides centralized bincode encoding and decoding of the diagnostic
    /// payload attached to packets in debug configurations.
    pub mod codec;
    pub mod packet;
    pub mod packet_codec;
}

/// Internal module exposing implementation details for testing, fuzzing and benchmarks.
///
/// **This module is NOT part of the public API.** Everything here may change
/// without notice.
#[doc(hidden)]
pub mod __internal {
    pub use crate::network::buffers::WireBuffers;
    pub use crate::network::packet::EventFlags;
    pub use crate::rle::{decode as rle_decode, encode as rle_encode};
    pub use crate::verify::ACTOR_FIELDS;
}

// #########
// # TYPES #
// #########

/// A tic is a single step of simulation time.
///
/// Tics are the unit of both gameplay and network synchronization. They are
/// carried on the wire as `u32`.
///
/// # Examples
///
/// ```
/// use ticwire::Tic;
///
/// let tic = Tic::new(10);
/// assert_eq!((tic + 1).as_u32(), 11);
/// assert_eq!(tic.prev(), Some(Tic::new(9)));
/// assert_eq!(Tic::ZERO.prev(), None);
/// assert_eq!(Tic::new(12) - tic, 2);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Tic(u32);

impl Tic {
    /// The first tic of a session.
    pub const ZERO: Tic = Tic(0);

    /// Creates a new `Tic` from a `u32` value.
    #[inline]
    #[must_use]
    pub const fn new(tic: u32) -> Self {
        Tic(tic)
    }

    /// Returns the underlying `u32` value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the tic before this one, or `None` at tic zero.
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Option<Tic> {
        match self.0.checked_sub(1) {
            Some(t) => Some(Tic(t)),
            None => None,
        }
    }

    /// Adds `n` tics, returning `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, n: u32) -> Option<Tic> {
        match self.0.checked_add(n) {
            Some(t) => Some(Tic(t)),
            None => None,
        }
    }
}

impl std::fmt::Display for Tic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<u32> for Tic {
    type Output = Tic;

    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Tic(self.0 + rhs)
    }
}

impl std::ops::AddAssign<u32> for Tic {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

impl std::ops::Sub<u32> for Tic {
    type Output = Tic;

    #[inline]
    fn sub(self, rhs: u32) -> Self::Output {
        Tic(self.0 - rhs)
    }
}

impl std::ops::Sub<Tic> for Tic {
    type Output = i64;

    #[inline]
    fn sub(self, rhs: Tic) -> Self::Output {
        i64::from(self.0) - i64::from(rhs.0)
    }
}

impl From<u32> for Tic {
    #[inline]
    fn from(value: u32) -> Self {
        Tic(value)
    }
}

impl From<Tic> for u32 {
    #[inline]
    fn from(tic: Tic) -> Self {
        tic.0
    }
}

impl PartialEq<u32> for Tic {
    #[inline]
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

/// Identifies a client in a session.
///
/// # Examples
///
/// ```
/// use ticwire::ClientId;
///
/// let client = ClientId::new(3);
/// assert_eq!(client.as_u32(), 3);
/// assert_eq!(client.to_string(), "3");
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct ClientId(u32);

impl ClientId {
    /// Creates a new `ClientId` from a `u32` value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        ClientId(id)
    }

    /// Returns the underlying `u32` value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClientId {
    #[inline]
    fn from(value: u32) -> Self {
        ClientId(value)
    }
}

impl From<ClientId> for u32 {
    #[inline]
    fn from(id: ClientId) -> Self {
        id.0
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
    fn test_tic_arithmetic() {
        let mut tic = Tic::new(5);
        tic += 3;
        assert_eq!(tic, 8);
        assert_eq!(tic - 2, Tic::new(6));
        assert_eq!(Tic::new(3) - Tic::new(5), -2);
    }

    #[test]
    fn test_tic_checked_add() {
        assert_eq!(Tic::new(u32::MAX).checked_add(1), None);
        assert_eq!(Tic::new(1).checked_add(1), Some(Tic::new(2)));
    }

    #[test]
    fn test_tic_ordering() {
        let mut tics = vec![Tic::new(9), Tic::new(2), Tic::new(5)];
        tics.sort();
        assert_eq!(tics, vec![Tic::new(2), Tic::new(5), Tic::new(9)]);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(u32::from(Tic::from(7u32)), 7);
        assert_eq!(u32::from(ClientId::from(4u32)), 4);
    }
}
