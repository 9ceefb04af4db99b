//! End-to-end determinism verification between two peers.
//!
//! Each peer runs a toy deterministic simulation, attaches its debug payload
//! to an outgoing packet, and the packet travels through a debug-trailer
//! codec before the other peer checks it.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use proptest::prelude::*;
use ticwire::telemetry::{CollectingObserver, DiagnosticKind, DiagnosticSeverity};
use ticwire::verify::{ActorField, CaptureStage, ACTOR_FIELDS};
use ticwire::{
    compare_full_state, ActorKind, ActorRecord, ClientId, DeterminismVerifier, DivergenceKind,
    NetConfig, Packet, PacketCodec, StateData, Tic, VerifierConfig,
};

/// A tiny deterministic simulation: one player drifting and one barrel.
struct Sim {
    state: StateData,
}

impl Sim {
    fn new(map_seed: u32) -> Self {
        let mut state = StateData {
            map_seed,
            seed: map_seed.wrapping_mul(2_654_435_761),
            next_id: 2,
            ..StateData::default()
        };
        state.actors_of_mut(ActorKind::Player).push(ActorRecord {
            id: 0,
            kind: ActorKind::Player,
            client: ClientId::new(1),
            hp: 100,
            ..ActorRecord::default()
        });
        state.actors_of_mut(ActorKind::Barrel).push(ActorRecord {
            id: 1,
            kind: ActorKind::Barrel,
            x: 4.0,
            hp: 20,
            ..ActorRecord::default()
        });
        Self { state }
    }

    /// Advances one tic, handing the mid-tic state to the verifier.
    fn step(&mut self, verifier: &mut DeterminismVerifier) {
        self.state.seed = self.state.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        for player in self.state.actors_of_mut(ActorKind::Player) {
            player.u = 0.5;
            player.x += player.u;
            player.anim0 = player.anim0.wrapping_add(1);
        }
        verifier.record_local_state(self.state.clone());
        self.state.tic += 1;
    }
}

struct Peer {
    id: ClientId,
    sim: Sim,
    verifier: DeterminismVerifier,
    codec: PacketCodec,
}

impl Peer {
    fn new(id: u32, config: NetConfig, observer: Arc<CollectingObserver>) -> Self {
        Self {
            id: ClientId::new(id),
            sim: Sim::new(77),
            verifier: DeterminismVerifier::new(config.verifier).with_observer(observer),
            codec: PacketCodec::new(config.wire).unwrap(),
        }
    }

    fn send(&mut self) -> Vec<u8> {
        let mut packet = Packet {
            sender: self.id,
            tic: self.sim.state.tic,
            ..Packet::default()
        };
        let state = &self.sim.state;
        self.verifier
            .attach_debug(&mut packet, state.counters(), state);
        self.codec.encode_to_vec(&packet).unwrap()
    }

    fn receive(&mut self, bytes: &[u8], confirmed: Tic) -> Vec<ticwire::DivergenceReport> {
        let packet = self.codec.decode(bytes).unwrap();
        let state = &self.sim.state;
        self.verifier
            .check_packet(packet.sender, &packet, &state.counters(), state, confirmed)
    }
}

fn peers(config: NetConfig) -> (Peer, Peer, Arc<CollectingObserver>) {
    let observer = Arc::new(CollectingObserver::new());
    (
        Peer::new(1, config, observer.clone()),
        Peer::new(2, config, observer.clone()),
        observer,
    )
}

#[test]
fn test_lockstep_peers_agree() {
    let (mut a, mut b, observer) = peers(NetConfig::debug());
    for _ in 0..30 {
        a.sim.step(&mut a.verifier);
        b.sim.step(&mut b.verifier);
        let bytes = a.send();
        let confirmed = b.sim.state.tic + 1;
        assert!(b.receive(&bytes, confirmed).is_empty());
    }
    assert!(observer.is_empty());
}

#[test]
fn test_single_field_divergence() {
    let (mut a, mut b, observer) = peers(NetConfig::debug());
    a.sim.step(&mut a.verifier);
    a.sim.state.actors_of_mut(ActorKind::Barrel)[0].x = 4.5;
    b.sim.step(&mut b.verifier);

    let bytes = a.send();
    let reports = b.receive(&bytes, Tic::new(2));
    assert_eq!(reports.len(), 1);
    let report = reports[0];
    assert_eq!(report.from, ClientId::new(1));
    assert_eq!(report.stage, CaptureStage::Final);
    assert_eq!(report.tic, Tic::new(1));
    match report.kind {
        DivergenceKind::FieldMismatch {
            kind, index, field, ..
        } => {
            assert_eq!(kind, ActorKind::Barrel);
            assert_eq!(index, 0);
            assert_eq!(field, ActorField::X);
        },
        other => panic!("expected field mismatch, got {other:?}"),
    }
    assert_eq!(
        observer
            .diagnostics_at_severity(DiagnosticSeverity::Error)
            .len(),
        1
    );
    assert!(observer.has_diagnostic(DiagnosticKind::Divergence));
}

#[test]
fn test_counters_only_detects_seed_divergence() {
    let config = NetConfig {
        verifier: VerifierConfig::default(),
        ..NetConfig::debug()
    };
    let (mut a, mut b, _observer) = peers(config);
    a.sim.step(&mut a.verifier);
    b.sim.step(&mut b.verifier);
    b.sim.state.seed ^= 1;
    a.sim.state.actors_of_mut(ActorKind::Player)[0].hp = 1;

    let bytes = a.send();
    let reports = b.receive(&bytes, Tic::new(2));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].stage, CaptureStage::Counters);
}

#[test]
fn test_stale_packet_is_ignored() {
    let (mut a, mut b, observer) = peers(NetConfig::debug());
    a.sim.step(&mut a.verifier);
    a.sim.state.seed = 0;
    let bytes = a.send();

    b.sim.step(&mut b.verifier);
    assert!(b.receive(&bytes, Tic::new(5)).is_empty());
    assert!(b.receive(&bytes, Tic::new(1)).is_empty());
    assert!(observer.is_empty());
}

#[test]
fn test_actor_list_size_mismatch() {
    let (mut a, mut b, _observer) = peers(NetConfig::debug());
    a.sim.step(&mut a.verifier);
    b.sim.step(&mut b.verifier);
    b.sim.state.actors_of_mut(ActorKind::Item).push(ActorRecord::default());

    let bytes = a.send();
    let reports = b.receive(&bytes, Tic::new(2));
    assert_eq!(
        reports.iter().map(|r| r.kind).collect::<Vec<_>>(),
        vec![DivergenceKind::ActorCountMismatch {
            kind: ActorKind::Item,
            local: 1,
            remote: 0,
        }]
    );
}

fn actor() -> impl Strategy<Value = ActorRecord> {
    (
        proptest::collection::vec(any::<u32>(), 8),
        proptest::collection::vec(any::<u32>(), 6),
    )
        .prop_map(|(floats, ints)| ActorRecord {
            x: f32::from_bits(floats[0]),
            y: f32::from_bits(floats[1]),
            z: f32::from_bits(floats[2]),
            u: f32::from_bits(floats[3]),
            v: f32::from_bits(floats[4]),
            w: f32::from_bits(floats[5]),
            s: f32::from_bits(floats[6]),
            t: f32::from_bits(floats[7]),
            id: ints[0],
            client: ClientId::new(ints[1]),
            buttons: ticwire::buttons::InputButtons::from_bits(ints[2]),
            weapon: ints[3],
            hp: ints[4],
            anim0: ints[5],
            ..ActorRecord::default()
        })
}

proptest! {
    /// A state never diverges from itself, NaNs included.
    #[test]
    fn prop_state_matches_itself(actors in proptest::collection::vec(actor(), 0..8), seed in any::<u32>()) {
        let mut state = StateData { seed, ..StateData::default() };
        *state.actors_of_mut(ActorKind::Bullet) = actors;
        let reports = compare_full_state(ClientId::new(1), CaptureStage::Final, &state, &state.clone());
        prop_assert!(reports.is_empty());
    }

    /// Changing one field of one actor yields exactly one report naming it.
    #[test]
    fn prop_one_changed_field_one_report(
        actors in proptest::collection::vec(actor(), 1..8),
        pick in any::<prop::sample::Index>(),
        field in 0usize..ACTOR_FIELDS.len(),
    ) {
        let mut local = StateData::default();
        *local.actors_of_mut(ActorKind::Player) = actors;
        let mut remote = local.clone();
        let index = pick.index(local.actors_of(ActorKind::Player).len());
        let target = &mut remote.actors_of_mut(ActorKind::Player)[index];
        let field = ACTOR_FIELDS[field];
        match field {
            ActorField::X => target.x = f32::from_bits(target.x.to_bits() ^ 1),
            ActorField::Y => target.y = f32::from_bits(target.y.to_bits() ^ 1),
            ActorField::Z => target.z = f32::from_bits(target.z.to_bits() ^ 1),
            ActorField::U => target.u = f32::from_bits(target.u.to_bits() ^ 1),
            ActorField::V => target.v = f32::from_bits(target.v.to_bits() ^ 1),
            ActorField::W => target.w = f32::from_bits(target.w.to_bits() ^ 1),
            ActorField::S => target.s = f32::from_bits(target.s.to_bits() ^ 1),
            ActorField::T => target.t = f32::from_bits(target.t.to_bits() ^ 1),
            ActorField::Id => target.id ^= 1,
            ActorField::Kind => target.kind = ActorKind::Item,
            ActorField::Client => target.client = ClientId::new(target.client.as_u32() ^ 1),
            ActorField::Buttons => {
                target.buttons = ticwire::buttons::InputButtons::from_bits(target.buttons.bits() ^ 1);
            },
            ActorField::Weapon => target.weapon ^= 1,
            ActorField::Hp => target.hp ^= 1,
            ActorField::Anim0 => target.anim0 ^= 1,
            ActorField::AnimHit => target.anim_hit ^= 1,
        }

        let reports = compare_full_state(ClientId::new(1), CaptureStage::Debug, &local, &remote);
        prop_assert_eq!(reports.len(), 1);
        match reports[0].kind {
            DivergenceKind::FieldMismatch { index: i, field: f, .. } => {
                prop_assert_eq!(i, index);
                prop_assert_eq!(f, field);
            },
            other => prop_assert!(false, "unexpected report {:?}", other),
        }
    }
}
