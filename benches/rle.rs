//! Benchmarks for the word run-length codec
//!
//! Run with: cargo bench --bench rle
//!
//! Inputs are word streams shaped like encoded packets: mostly zero flag
//! words with sparse payload words.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use ticwire::rle::{decode, decode_into, encode, encode_into, encoded_len};

/// Quiet packet: every tic is a zero flags word
fn quiet_words(words: usize) -> Vec<u8> {
    vec![0u8; words * 4]
}

/// One button word every `period` tics
fn sparse_words(words: usize, period: usize) -> Vec<u8> {
    (0..words)
        .flat_map(|i| {
            let word = if i % period == 0 { (i as u32) | 1 } else { 0 };
            word.to_le_bytes()
        })
        .collect()
}

/// No two adjacent words equal (worst case)
fn dense_words(words: usize) -> Vec<u8> {
    (0..words)
        .flat_map(|i| (i as u32).wrapping_mul(2_654_435_761).to_le_bytes())
        .collect()
}

fn scenarios(words: usize) -> [(&'static str, Vec<u8>); 3] {
    [
        ("quiet", quiet_words(words)),
        ("sparse", sparse_words(words, 5)),
        ("dense", dense_words(words)),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("RLE encode");

    for words in [16, 128, 512] {
        for (name, data) in scenarios(words) {
            group.throughput(Throughput::Bytes(data.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, words), &data, |b, data| {
                b.iter(|| encode(black_box(data)));
            });
        }
    }

    group.finish();
}

fn bench_encode_into(c: &mut Criterion) {
    let mut group = c.benchmark_group("RLE encode_into");

    for words in [128, 512] {
        for (name, data) in scenarios(words) {
            let mut dst = vec![0u8; encoded_len(&data)];
            group.throughput(Throughput::Bytes(data.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, words), &data, |b, data| {
                b.iter(|| encode_into(black_box(data), &mut dst));
            });
        }
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("RLE decode");

    for words in [16, 128, 512] {
        for (name, data) in scenarios(words) {
            let encoded = encode(&data);
            group.throughput(Throughput::Bytes(data.len() as u64));
            group.bench_with_input(BenchmarkId::new(name, words), &encoded, |b, encoded| {
                b.iter(|| decode(black_box(encoded), data.len()));
            });
        }
    }

    group.finish();
}

fn bench_decode_into(c: &mut Criterion) {
    let mut group = c.benchmark_group("RLE decode_into");

    for (name, data) in scenarios(512) {
        let encoded = encode(&data);
        let mut dst = vec![0u8; data.len()];
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| decode_into(black_box(&encoded), data.len(), &mut dst));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_encode_into,
    bench_decode,
    bench_decode_into
);
criterion_main!(benches);
