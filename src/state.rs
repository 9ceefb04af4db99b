//! Simulation state as seen by the determinism verifier.
//!
//! The simulation layer owns and produces these values once per tic; this
//! crate only reads them, compares them, and copies them into debug payloads.

use serde::{Deserialize, Serialize};

use crate::buttons::InputButtons;
use crate::error::CorruptReason;
use crate::{ClientId, Tic};

/// Category of a simulated actor. The discriminant is the wire value.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum ActorKind {
    /// A client-controlled avatar.
    #[default]
    Player = 0,
    /// A destructible prop.
    Barrel = 1,
    /// A projectile.
    Bullet = 2,
    /// A pickup.
    Item = 3,
}

impl ActorKind {
    /// Number of actor kinds.
    pub const COUNT: usize = 4;

    /// Every kind, in bucket order.
    pub const ALL: [ActorKind; Self::COUNT] = [
        ActorKind::Player,
        ActorKind::Barrel,
        ActorKind::Bullet,
        ActorKind::Item,
    ];

    /// Bucket index of this kind in [`StateData::actors`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns a string representation suitable for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Barrel => "barrel",
            Self::Bullet => "bullet",
            Self::Item => "item",
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u32> for ActorKind {
    type Error = CorruptReason;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Player),
            1 => Ok(Self::Barrel),
            2 => Ok(Self::Bullet),
            3 => Ok(Self::Item),
            _ => Err(CorruptReason::UnknownActorKind { offset: 0, value }),
        }
    }
}

/// One actor as recorded for verification.
///
/// `x`/`y`/`z` is the position, `u`/`v`/`w` the velocity and `s`/`t` the
/// orientation pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Position z (height).
    pub z: f32,
    /// Velocity x.
    pub u: f32,
    /// Velocity y.
    pub v: f32,
    /// Velocity z.
    pub w: f32,
    /// First orientation component.
    pub s: f32,
    /// Second orientation component.
    pub t: f32,
    /// Entity id.
    pub id: u32,
    /// Actor kind.
    pub kind: ActorKind,
    /// Owning client.
    pub client: ClientId,
    /// Input state applied this tic.
    pub buttons: InputButtons,
    /// Equipped weapon.
    pub weapon: u32,
    /// Health.
    pub hp: u32,
    /// Base animation phase.
    pub anim0: u32,
    /// Hit animation phase.
    pub anim_hit: u32,
}

/// The counters every debug payload carries, even without a full state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StateCounters {
    /// Tic these counters belong to.
    pub tic: Tic,
    /// Simulation RNG state.
    pub seed: u32,
    /// Next entity id to allocate.
    pub next_id: u32,
}

/// Full simulation state at one tic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateData {
    /// Next entity id to allocate.
    pub next_id: u32,
    /// Simulation RNG state.
    pub seed: u32,
    /// World generation seed.
    pub map_seed: u32,
    /// Tic this state represents.
    pub tic: Tic,
    /// Actors bucketed by [`ActorKind::index`], each bucket in simulation order.
    pub actors: [Vec<ActorRecord>; ActorKind::COUNT],
}

impl StateData {
    /// Actors of one kind.
    #[must_use]
    pub fn actors_of(&self, kind: ActorKind) -> &[ActorRecord] {
        &self.actors[kind.index()]
    }

    /// Mutable access to the actors of one kind.
    pub fn actors_of_mut(&mut self, kind: ActorKind) -> &mut Vec<ActorRecord> {
        &mut self.actors[kind.index()]
    }

    /// Total number of actors across all kinds.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.iter().map(Vec::len).sum()
    }

    /// The counters of this state.
    #[must_use]
    pub const fn counters(&self) -> StateCounters {
        StateCounters {
            tic: self.tic,
            seed: self.seed,
            next_id: self.next_id,
        }
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
    fn test_actor_kind_wire_values() {
        for kind in ActorKind::ALL {
            assert_eq!(ActorKind::try_from(kind as u32), Ok(kind));
            assert_eq!(ActorKind::ALL[kind.index()], kind);
        }
        assert!(ActorKind::try_from(4).is_err());
    }

    #[test]
    fn test_actor_buckets() {
        let mut state = StateData::default();
        state.actors_of_mut(ActorKind::Bullet).push(ActorRecord {
            kind: ActorKind::Bullet,
            id: 7,
            ..ActorRecord::default()
        });
        assert_eq!(state.actors_of(ActorKind::Bullet).len(), 1);
        assert!(state.actors_of(ActorKind::Player).is_empty());
        assert_eq!(state.actor_count(), 1);
    }

    #[test]
    fn test_counters() {
        let state = StateData {
            next_id: 40,
            seed: 0xDEAD,
            tic: Tic::new(12),
            ..StateData::default()
        };
        assert_eq!(
            state.counters(),
            StateCounters {
                tic: Tic::new(12),
                seed: 0xDEAD,
                next_id: 40,
            }
        );
    }
}
