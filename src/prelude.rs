//! Convenient re-exports for common usage.
//!
//! ```rust
//! use ticwire::prelude::*;
//!
//! let mut codec = PacketCodec::new(WireConfig::default())?;
//! let packet = Packet {
//!     sender: ClientId::new(1),
//!     events: vec![ClientEvent::buttons(Tic::new(4), InputButtons::from(ButtonFlags::RUN))],
//!     ..Packet::default()
//! };
//! let bytes = codec.encode_to_vec(&packet)?;
//! let decoded = codec.decode(&bytes)?;
//! assert_eq!(decoded.events, packet.events);
//! # Ok::<(), TicwireError>(())
//! ```
//!
//! # What's Included
//!
//! - **Fundamental types**: [`Tic`], [`ClientId`]
//! - **Packets**: [`Packet`], [`ClientEvent`], [`Snapshot`], [`ActorInit`], [`Vec3`], [`DebugPayload`]
//! - **Input**: [`InputButtons`], [`ButtonFlags`]
//! - **Codec**: [`PacketCodec`]
//! - **Verification**: [`DeterminismVerifier`], [`DivergenceReport`], [`DivergenceKind`], [`StateData`], [`StateCounters`]
//! - **Prediction**: [`PredictionWindow`], [`PredictionClock`], [`AheadTics`]
//! - **Configuration**: [`NetConfig`], [`WireConfig`], [`PredictionConfig`], [`VerifierConfig`], [`CompressionMode`]
//! - **Error handling**: [`TicwireError`], [`Result`]

pub use crate::{ClientId, Tic};

pub use crate::{ActorInit, ClientEvent, DebugPayload, Packet, Snapshot, Vec3};

pub use crate::buttons::{ButtonFlags, InputButtons};

pub use crate::PacketCodec;

pub use crate::{
    ActorKind, ActorRecord, DeterminismVerifier, DivergenceKind, DivergenceReport, StateCounters,
    StateData,
};

pub use crate::{AheadTics, PredictionClock, PredictionWindow};

pub use crate::{CompressionMode, NetConfig, PredictionConfig, VerifierConfig, WireConfig};

pub use crate::{Result, TicwireError};
