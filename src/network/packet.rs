//! Application-level packet types.
//!
//! A [`Packet`] is one network message: a header, the sender's input for a
//! contiguous tic range, an optional bootstrap [`Snapshot`] and, in debug
//! configurations, a [`DebugPayload`].

use serde::{Deserialize, Serialize};

use crate::buttons::InputButtons;
use crate::state::{ActorKind, StateCounters, StateData};
use crate::{ClientId, Tic};

/// A 3D vector of simulation floats.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Presence bits of the flags word that opens every event entry.
///
/// # Note
///
/// This type is re-exported in [`__internal`](crate::__internal) for testing and fuzzing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventFlags(u32);

impl EventFlags {
    /// A buttons word follows.
    pub const BUTTONS: u32 = 0x1;
    /// Three spawn position floats follow.
    pub const SPAWN: u32 = 0x2;
    /// An explicit client id follows.
    pub const CLIENT: u32 = 0x4;
    /// All known bits.
    pub const KNOWN: u32 = Self::BUTTONS | Self::SPAWN | Self::CLIENT;

    /// Flags describing `event`.
    #[must_use]
    pub fn of(event: &ClientEvent) -> Self {
        let mut bits = 0;
        if event.buttons.is_some() {
            bits |= Self::BUTTONS;
        }
        if event.spawn.is_some() {
            bits |= Self::SPAWN;
        }
        if event.client.is_some() {
            bits |= Self::CLIENT;
        }
        Self(bits)
    }

    /// Parses a flags word, returning `None` if it carries unknown bits.
    #[must_use]
    pub const fn from_word(word: u32) -> Option<Self> {
        if word & !Self::KNOWN != 0 {
            None
        } else {
            Some(Self(word))
        }
    }

    /// The raw word.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if `bit` is set.
    #[must_use]
    pub const fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Number of payload words following the flags word.
    #[must_use]
    pub const fn payload_words(self) -> usize {
        let mut words = 0;
        if self.has(Self::BUTTONS) {
            words += 1;
        }
        if self.has(Self::SPAWN) {
            words += 3;
        }
        if self.has(Self::CLIENT) {
            words += 1;
        }
        words
    }
}

/// One tic's worth of input for one client.
///
/// On the wire the tic is implicit: it is the entry's position within the
/// packet's event range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientEvent {
    /// Tic this input applies to.
    pub tic: Tic,
    /// Held or pressed inputs.
    pub buttons: Option<InputButtons>,
    /// Spawn position, present only on spawn requests.
    pub spawn: Option<Vec3>,
    /// Originating client when it differs from the packet's sender.
    pub client: Option<ClientId>,
}

impl ClientEvent {
    /// An event with no payload.
    #[must_use]
    pub const fn placeholder(tic: Tic) -> Self {
        Self {
            tic,
            buttons: None,
            spawn: None,
            client: None,
        }
    }

    /// An event carrying only a buttons word.
    #[must_use]
    pub const fn buttons(tic: Tic, buttons: InputButtons) -> Self {
        Self {
            tic,
            buttons: Some(buttons),
            spawn: None,
            client: None,
        }
    }

    /// Returns `true` if no optional field is present.
    ///
    /// Decoded packets contain one event per tic of their range; quiet tics
    /// decode as placeholders.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.buttons.is_none() && self.spawn.is_none() && self.client.is_none()
    }

    /// The client this event is attributed to.
    #[must_use]
    pub fn origin(&self, sender: ClientId) -> ClientId {
        self.client.unwrap_or(sender)
    }
}

/// One actor of a bootstrap snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActorInit {
    /// Actor kind.
    pub kind: ActorKind,
    /// Owning client.
    pub client: ClientId,
    /// Initial input state.
    pub buttons: InputButtons,
    /// Initial position.
    pub position: Vec3,
    /// Initial velocity.
    pub velocity: Vec3,
}

impl ActorInit {
    /// Words one actor occupies on the wire.
    pub const WIRE_WORDS: usize = 9;
}

/// Full bootstrap state for a newly joined or resynchronizing peer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Seed of deterministic world generation.
    pub map_seed: u32,
    /// Seed of the simulation RNG.
    pub start_seed: u32,
    /// Actors in creation order.
    pub actors: Vec<ActorInit>,
}

/// Diagnostic payload attached to packets in debug configurations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DebugPayload {
    /// Tic the counters and states describe.
    pub tic: Tic,
    /// Simulation RNG state.
    pub seed: u32,
    /// Next entity id to allocate.
    pub next_id: u32,
    /// State captured by the sender's debug hook, when full-state capture is on.
    pub state: Option<StateData>,
    /// The sender's final state of the tic, when full-state capture is on.
    pub final_state: Option<StateData>,
}

impl DebugPayload {
    /// The counters of this payload.
    #[must_use]
    pub const fn counters(&self) -> StateCounters {
        StateCounters {
            tic: self.tic,
            seed: self.seed,
            next_id: self.next_id,
        }
    }
}

impl From<StateCounters> for DebugPayload {
    fn from(counters: StateCounters) -> Self {
        Self {
            tic: counters.tic,
            seed: counters.seed,
            next_id: counters.next_id,
            state: None,
            final_state: None,
        }
    }
}

/// One network message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Packet {
    /// The sender believes the receiver needs a baseline.
    pub sync: bool,
    /// Originating client.
    pub sender: ClientId,
    /// Last tic the sender has received from this packet's destination.
    pub ack_tic: Tic,
    /// Sender's authoritative tic at time of send.
    pub tic: Tic,
    /// Input events. Encoding sorts them by tic; tics must be unique.
    pub events: Vec<ClientEvent>,
    /// Bootstrap state.
    pub snapshot: Option<Snapshot>,
    /// Diagnostic payload; only carried by codecs with the debug trailer enabled.
    pub debug: Option<DebugPayload>,
}

impl Packet {
    /// Events that carry input, skipping placeholder entries.
    pub fn active_events(&self) -> impl Iterator<Item = &ClientEvent> {
        self.events.iter().filter(|e| !e.is_placeholder())
    }

    /// First and last tic of the event range, if there are events.
    #[must_use]
    pub fn event_range(&self) -> Option<(Tic, Tic)> {
        let first = self.events.iter().map(|e| e.tic).min()?;
        let last = self.events.iter().map(|e| e.tic).max()?;
        Some((first, last))
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
    fn test_event_flags_of() {
        let event = ClientEvent {
            tic: Tic::new(1),
            buttons: Some(InputButtons::from_bits(1)),
            spawn: Some(Vec3::new(1.0, 2.0, 3.0)),
            client: None,
        };
        let flags = EventFlags::of(&event);
        assert_eq!(flags.bits(), EventFlags::BUTTONS | EventFlags::SPAWN);
        assert_eq!(flags.payload_words(), 4);
    }

    #[test]
    fn test_event_flags_rejects_unknown_bits() {
        assert!(EventFlags::from_word(0x8).is_none());
        assert_eq!(EventFlags::from_word(0x7).map(EventFlags::bits), Some(7));
    }

    #[test]
    fn test_placeholder_and_origin() {
        let quiet = ClientEvent::placeholder(Tic::new(4));
        assert!(quiet.is_placeholder());
        assert_eq!(quiet.origin(ClientId::new(2)), ClientId::new(2));

        let relayed = ClientEvent {
            client: Some(ClientId::new(9)),
            ..quiet
        };
        assert!(!relayed.is_placeholder());
        assert_eq!(relayed.origin(ClientId::new(2)), ClientId::new(9));
    }

    #[test]
    fn test_event_range_and_active_events() {
        let packet = Packet {
            events: vec![
                ClientEvent::placeholder(Tic::new(6)),
                ClientEvent::buttons(Tic::new(8), InputButtons::from_bits(2)),
                ClientEvent::buttons(Tic::new(5), InputButtons::from_bits(1)),
            ],
            ..Packet::default()
        };
        assert_eq!(packet.event_range(), Some((Tic::new(5), Tic::new(8))));
        assert_eq!(packet.active_events().count(), 2);
        assert_eq!(Packet::default().event_range(), None);
    }
}
