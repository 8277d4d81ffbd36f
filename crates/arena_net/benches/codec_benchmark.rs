//! # Codec and Ordering Benchmark
//!
//! Per-tick hot path of a full room: encode our snapshot, decode a burst
//! from every other tank, then dedup and order it.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use arena_net::protocol::{AckBody, UpdateBody};
use arena_net::{decode, encode, Packet, PacketKind, PacketOrderer, Payload};
use arena_shared::Vec2;

/// Datagrams in one burst: seven remote tanks, a few acks, some duplicates.
const BURST: usize = 16;

fn snapshot(sequence: u32, sender: u8) -> Packet {
    let body = UpdateBody::new(
        Vec2::new(f32::from(sender) * 10.0, 250.0),
        Vec2::new(100.0, 0.0),
        Vec2::ZERO,
        45.0,
        1,
        sender,
    );
    Packet::new(sequence, sender, f64::from(sequence) * 0.05, Payload::GameUpdate(body))
}

/// Deterministic mixed burst, deliberately out of order.
fn burst() -> Vec<[u8; arena_net::PACKET_SIZE]> {
    let mut packets: Vec<Packet> = (1..=7u8)
        .map(|sender| snapshot(100 - u32::from(sender), sender))
        .collect();
    for sequence in 40..44 {
        packets.push(Packet::new(
            sequence,
            0,
            0.0,
            Payload::Ack(AckBody::new(PacketKind::Fire, sequence)),
        ));
    }
    while packets.len() < BURST {
        let copy = packets[packets.len() % 7];
        packets.push(copy);
    }
    packets.iter().map(encode).collect()
}

fn bench_encode(c: &mut Criterion) {
    let packet = snapshot(1, 3);
    c.bench_function("encode_game_update", |b| {
        b.iter(|| black_box(encode(black_box(&packet))));
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode(&snapshot(1, 3));
    c.bench_function("decode_game_update", |b| {
        b.iter(|| black_box(decode(black_box(&bytes))));
    });

    let mut garbage = bytes;
    garbage[0] = 0xFF;
    c.bench_function("decode_reject_unknown_kind", |b| {
        b.iter(|| black_box(decode(black_box(&garbage)).is_err()));
    });
}

fn bench_burst(c: &mut Criterion) {
    let datagrams = burst();
    let mut orderer = PacketOrderer::new();

    c.bench_function("decode_dedup_order_burst_16", |b| {
        b.iter(|| {
            for bytes in &datagrams {
                if let Ok(packet) = decode(bytes) {
                    orderer.push(packet);
                }
            }
            black_box(orderer.drain_ordered().len())
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_burst);
criterion_main!(benches);
