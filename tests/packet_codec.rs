//! Property-based tests for the packet codec and the run-length pass.
//!
//! # Properties Tested
//!
//! - Encoding then decoding reproduces the header and every event, with
//!   placeholders at the quiet tics of the range.
//! - The run-length pass restores any buffer it compressed.
//! - Snapshots and debug payloads survive the wire unchanged.
//! - Arbitrary bytes are rejected with an error, never a panic.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use ticwire::buttons::InputButtons;
use ticwire::rle;
use ticwire::telemetry::{CollectingObserver, DiagnosticKind};
use ticwire::{
    ActorInit, ActorKind, ClientEvent, ClientId, CompressionMode, DebugPayload, Packet,
    PacketCodec, Snapshot, StateData, Tic, TicwireError, Vec3, WireConfig,
};

// ============================================================================
// Strategies
// ============================================================================

fn finite_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(0.0f32),
        Just(-0.0f32),
        -1.0e6f32..1.0e6f32,
        any::<u32>().prop_map(|bits| {
            let f = f32::from_bits(bits);
            if f.is_finite() {
                f
            } else {
                1.5
            }
        }),
    ]
}

fn vec3() -> impl Strategy<Value = Vec3> {
    (finite_f32(), finite_f32(), finite_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn event_body() -> impl Strategy<Value = (Option<u32>, Option<Vec3>, Option<u32>)> {
    (
        proptest::option::of(any::<u32>()),
        proptest::option::of(vec3()),
        proptest::option::of(0u32..16),
    )
}

/// Events at unique tics within a window of 64 tics above `base`.
fn events() -> impl Strategy<Value = Vec<ClientEvent>> {
    (
        0u32..100_000,
        proptest::collection::btree_map(0u32..64, event_body(), 0..24),
    )
        .prop_map(|(base, bodies): (u32, BTreeMap<u32, _>)| {
            bodies
                .into_iter()
                .map(|(offset, (buttons, spawn, client))| ClientEvent {
                    tic: Tic::new(base + offset),
                    buttons: buttons.map(InputButtons::from_bits),
                    spawn,
                    client: client.map(ClientId::new),
                })
                .collect()
        })
}

fn actor_kind() -> impl Strategy<Value = ActorKind> {
    prop_oneof![
        Just(ActorKind::Player),
        Just(ActorKind::Barrel),
        Just(ActorKind::Bullet),
        Just(ActorKind::Item),
    ]
}

fn snapshot() -> impl Strategy<Value = Snapshot> {
    (
        any::<u32>(),
        any::<u32>(),
        proptest::collection::vec(
            (actor_kind(), 0u32..16, any::<u32>(), vec3(), vec3()),
            0..12,
        ),
    )
        .prop_map(|(map_seed, start_seed, actors)| Snapshot {
            map_seed,
            start_seed,
            actors: actors
                .into_iter()
                .map(|(kind, client, buttons, position, velocity)| ActorInit {
                    kind,
                    client: ClientId::new(client),
                    buttons: InputButtons::from_bits(buttons),
                    position,
                    velocity,
                })
                .collect(),
        })
}

fn packet() -> impl Strategy<Value = Packet> {
    (
        any::<bool>(),
        0u32..16,
        any::<u32>(),
        any::<u32>(),
        events(),
        proptest::option::of(snapshot()),
    )
        .prop_map(|(sync, sender, ack_tic, tic, events, snapshot)| Packet {
            sync,
            sender: ClientId::new(sender),
            ack_tic: Tic::new(ack_tic),
            tic: Tic::new(tic),
            events,
            snapshot,
            debug: None,
        })
}

fn compression() -> impl Strategy<Value = CompressionMode> {
    prop_oneof![Just(CompressionMode::None), Just(CompressionMode::Rle)]
}

/// The events a decoder reconstructs: the input with placeholders filling the gaps.
fn with_placeholders(events: &[ClientEvent]) -> Vec<ClientEvent> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Vec::new();
    };
    let by_tic: BTreeMap<Tic, ClientEvent> = events.iter().map(|e| (e.tic, *e)).collect();
    (first.tic.as_u32()..=last.tic.as_u32())
        .map(Tic::new)
        .map(|tic| {
            by_tic
                .get(&tic)
                .copied()
                .unwrap_or(ClientEvent::placeholder(tic))
        })
        .collect()
}

fn codec(compression: CompressionMode) -> PacketCodec {
    PacketCodec::new(WireConfig {
        compression,
        capacity_words: 2048,
        ..WireConfig::default()
    })
    .unwrap()
}

// ============================================================================
// Round Trip Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Header fields and events survive, gaps decode as placeholders.
    #[test]
    fn prop_packet_round_trip(packet in packet(), compression in compression()) {
        let mut codec = codec(compression);
        let bytes = codec.encode_to_vec(&packet).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        prop_assert_eq!(decoded.sync, packet.sync);
        prop_assert_eq!(decoded.sender, packet.sender);
        prop_assert_eq!(decoded.ack_tic, packet.ack_tic);
        prop_assert_eq!(decoded.tic, packet.tic);
        prop_assert_eq!(&decoded.events, &with_placeholders(&packet.events));
        prop_assert_eq!(&decoded.snapshot, &packet.snapshot);
        prop_assert!(decoded.debug.is_none());
    }

    /// Event order in the packet does not affect the encoding.
    #[test]
    fn prop_encoding_ignores_event_order(packet in packet()) {
        let mut reversed = packet.clone();
        reversed.events.reverse();

        let mut codec = codec(CompressionMode::None);
        let sorted_bytes = codec.encode_to_vec(&packet).unwrap();
        let reversed_bytes = codec.encode_to_vec(&reversed).unwrap();
        prop_assert_eq!(sorted_bytes, reversed_bytes);
    }

    /// The run-length pass restores every buffer it compressed.
    #[test]
    fn prop_rle_round_trip(data in proptest::collection::vec(
        prop_oneof![3 => Just(0u8), 1 => any::<u8>()],
        0..2048,
    )) {
        let encoded = rle::encode(&data);
        prop_assert_eq!(encoded.len(), rle::encoded_len(&data));
        prop_assert_eq!(rle::decode(&encoded, data.len()).unwrap(), data);
    }

    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn prop_garbage_is_rejected_without_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..512),
        compression in compression(),
    ) {
        let mut codec = codec(compression);
        if let Err(err) = codec.decode(&bytes) {
            prop_assert!(err.is_decode_error(), "unexpected error kind: {err}");
        }
    }

    /// Every strict prefix of a valid encoding is rejected.
    #[test]
    fn prop_truncated_word_stream_is_rejected(packet in packet(), cut in any::<prop::sample::Index>()) {
        let mut codec = codec(CompressionMode::None);
        let bytes = codec.encode_to_vec(&packet).unwrap();
        let cut = cut.index(bytes.len());
        prop_assert!(codec.decode(&bytes[..cut]).is_err());
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_gap_fidelity() {
    let mut codec = codec(CompressionMode::Rle);
    let packet = Packet {
        events: vec![
            ClientEvent::buttons(Tic::new(5), InputButtons::from_bits(1)),
            ClientEvent::buttons(Tic::new(8), InputButtons::from_bits(2)),
        ],
        ..Packet::default()
    };
    let bytes = codec.encode_to_vec(&packet).unwrap();
    let decoded = codec.decode(&bytes).unwrap();

    let tics: Vec<u32> = decoded.events.iter().map(|e| e.tic.as_u32()).collect();
    assert_eq!(tics, vec![5, 6, 7, 8]);
    assert!(decoded.events[1].is_placeholder());
    assert!(decoded.events[2].is_placeholder());
    assert_eq!(decoded.active_events().count(), 2);
}

#[test]
fn test_snapshot_of_three_actors() {
    let actors: Vec<ActorInit> = (0..3u8)
        .map(|i| ActorInit {
            kind: ActorKind::ALL[usize::from(i)],
            client: ClientId::new(u32::from(i)),
            buttons: InputButtons::from_bits(u32::from(i) << 4),
            position: Vec3::new(f32::from(i), 0.25, -1.5),
            velocity: Vec3::new(-0.0, f32::MIN_POSITIVE, 3.0e-7),
        })
        .collect();
    let packet = Packet {
        sync: true,
        snapshot: Some(Snapshot {
            map_seed: 0xDEAD_BEEF,
            start_seed: 42,
            actors: actors.clone(),
        }),
        ..Packet::default()
    };

    for compression in [CompressionMode::None, CompressionMode::Rle] {
        let mut codec = codec(compression);
        let bytes = codec.encode_to_vec(&packet).unwrap();
        let snapshot = codec.decode(&bytes).unwrap().snapshot.unwrap();
        assert_eq!(snapshot.actors.len(), 3);
        for (decoded, original) in snapshot.actors.iter().zip(&actors) {
            assert_eq!(
                decoded.velocity.x.to_bits(),
                original.velocity.x.to_bits()
            );
            assert_eq!(decoded, original);
        }
    }
}

#[test]
fn test_debug_trailer_carries_full_state() {
    let mut state = StateData {
        tic: Tic::new(7),
        seed: 11,
        next_id: 3,
        map_seed: 5,
        ..StateData::default()
    };
    state.actors_of_mut(ActorKind::Bullet).push(ticwire::ActorRecord {
        id: 2,
        kind: ActorKind::Bullet,
        u: 12.5,
        ..ticwire::ActorRecord::default()
    });
    let packet = Packet {
        tic: Tic::new(8),
        debug: Some(DebugPayload {
            state: Some(state.clone()),
            final_state: Some(state.clone()),
            ..DebugPayload::from(state.counters())
        }),
        ..Packet::default()
    };

    let mut codec = PacketCodec::new(WireConfig::debug()).unwrap();
    let bytes = codec.encode_to_vec(&packet).unwrap();
    let decoded = codec.decode(&bytes).unwrap();
    assert_eq!(decoded, packet);

    // Without the trailer the payload is not sent.
    let mut plain = PacketCodec::new(WireConfig::default()).unwrap();
    let bytes = plain.encode_to_vec(&packet).unwrap();
    let decoded = plain.decode(&bytes).unwrap();
    assert!(decoded.debug.is_none());
}

#[test]
fn test_overflow_reports_required_size() {
    let mut codec = PacketCodec::new(WireConfig {
        capacity_words: 16,
        compression: CompressionMode::None,
        ..WireConfig::default()
    })
    .unwrap();
    let packet = Packet {
        events: (0..20)
            .map(|t| ClientEvent::buttons(Tic::new(t), InputButtons::from_bits(t)))
            .collect(),
        ..Packet::default()
    };
    match codec.encode(&packet) {
        Err(TicwireError::EncodeOverflow {
            required, capacity, ..
        }) => {
            assert_eq!(capacity, 16);
            // header + 20 flags words + 20 button words
            assert_eq!(required, 7 + 40);
        },
        other => panic!("expected overflow, got {other:?}"),
    }
}

#[test]
fn test_malformed_packet_is_reported() {
    let observer = Arc::new(CollectingObserver::new());
    let mut codec = PacketCodec::new(WireConfig::uncompressed())
        .unwrap()
        .with_observer(observer.clone());

    assert!(codec.decode(&[1, 2, 3]).is_err());
    assert!(codec.decode(&[0u8; 12]).is_err());
    assert_eq!(
        observer
            .diagnostics_of_kind(DiagnosticKind::MalformedPacket)
            .len(),
        2
    );
}
