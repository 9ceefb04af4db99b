//! Benchmarks for packet encoding and decoding
//!
//! Run with: cargo bench --bench packet_codec

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use ticwire::buttons::{ButtonFlags, InputButtons};
use ticwire::{
    ActorInit, ActorKind, ClientEvent, ClientId, CompressionMode, Packet, PacketCodec, Snapshot,
    Tic, Vec3, WireConfig,
};

/// Input for `tics` consecutive tics, with a button change every `period` tics
fn input_packet(tics: u32, period: u32) -> Packet {
    Packet {
        sender: ClientId::new(1),
        ack_tic: Tic::new(1000),
        tic: Tic::new(1000 + tics),
        events: (0..tics)
            .filter(|t| t % period == 0)
            .map(|t| {
                let buttons = InputButtons::from(ButtonFlags::MOVE | ButtonFlags::RUN)
                    .with_move_angle(t % 64);
                ClientEvent::buttons(Tic::new(1000 + t), buttons)
            })
            .collect(),
        ..Packet::default()
    }
}

fn bootstrap_packet(actors: usize) -> Packet {
    Packet {
        sync: true,
        snapshot: Some(Snapshot {
            map_seed: 7,
            start_seed: 11,
            actors: (0..actors)
                .map(|i| ActorInit {
                    kind: ActorKind::ALL[i % ActorKind::COUNT],
                    client: ClientId::new((i % 4) as u32),
                    buttons: InputButtons::default(),
                    position: Vec3::new(i as f32, 0.0, 1.5),
                    velocity: Vec3::default(),
                })
                .collect(),
        }),
        ..Packet::default()
    }
}

fn codec(compression: CompressionMode) -> PacketCodec {
    PacketCodec::new(WireConfig {
        compression,
        capacity_words: 4096,
        ..WireConfig::default()
    })
    .expect("valid config")
}

fn modes() -> [(&'static str, CompressionMode); 2] {
    [("raw", CompressionMode::None), ("rle", CompressionMode::Rle)]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Packet encode");

    for tics in [8, 32, 128] {
        let packet = input_packet(tics, 4);
        group.throughput(Throughput::Elements(u64::from(tics)));
        for (name, mode) in modes() {
            let mut codec = codec(mode);
            group.bench_with_input(BenchmarkId::new(name, tics), &packet, |b, packet| {
                b.iter(|| codec.encode(black_box(packet)).map(<[u8]>::len));
            });
        }
    }

    let packet = bootstrap_packet(200);
    for (name, mode) in modes() {
        let mut codec = codec(mode);
        group.bench_function(format!("snapshot_200/{name}"), |b| {
            b.iter(|| codec.encode(black_box(&packet)).map(<[u8]>::len));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Packet decode");

    for tics in [8, 32, 128] {
        let packet = input_packet(tics, 4);
        for (name, mode) in modes() {
            let mut codec = codec(mode);
            let bytes = codec.encode_to_vec(&packet).expect("encodable");
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, tics), &bytes, |b, bytes| {
                b.iter(|| codec.decode(black_box(bytes)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
