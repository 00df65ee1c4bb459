//! Criterion benchmarks for the frame header and command block codec.
//!
//! The engine parses every inbound datagram and walks its command blocks
//! once per 10ms tick, so both paths sit on the tick budget. The initial
//! state dump after a handshake is the worst case: one frame carrying
//! dozens of blocks.
//!
//! Run with:
//! ```bash
//! cargo bench --package atem-core --bench codec_bench
//! ```

use atem_core::protocol::command::{CommandReader, ControlCommand, StateCommand};
use atem_core::protocol::header::{encode_ack, encode_header, FrameHeader, HeaderFlags, HEADER_SIZE};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_heartbeat_frame() -> [u8; HEADER_SIZE] {
    encode_header(HeaderFlags(HeaderFlags::ACK_REQUEST), 12, 0x8001, 42)
}

/// A data frame carrying `blocks` alternating program/preview reports plus
/// the odd unrecognized tag, the shape of an initial state dump.
fn make_state_frame(blocks: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for i in 0..blocks {
        let (tag, source) = match i % 3 {
            0 => (*b"PrgI", 1u16 + (i % 8) as u16),
            1 => (*b"PrvI", 1u16 + ((i + 1) % 8) as u16),
            _ => (*b"Time", 0),
        };
        payload.extend_from_slice(&12u16.to_be_bytes());
        payload.extend_from_slice(&[0, 0]);
        payload.extend_from_slice(&tag);
        payload.extend_from_slice(&[0, 0]);
        payload.extend_from_slice(&source.to_be_bytes());
    }

    let total = (HEADER_SIZE + payload.len()) as u16;
    let mut frame =
        encode_header(HeaderFlags(HeaderFlags::ACK_REQUEST), total, 0x8001, 7).to_vec();
    frame.extend_from_slice(&payload);
    frame
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks header parse and the two header encoders.
fn bench_header(c: &mut Criterion) {
    let heartbeat = make_heartbeat_frame();

    let mut group = c.benchmark_group("header");
    group.bench_function("parse", |b| {
        b.iter(|| FrameHeader::parse(black_box(&heartbeat)).expect("parse must succeed"))
    });
    group.bench_function("encode", |b| {
        b.iter(|| {
            encode_header(
                black_box(HeaderFlags(HeaderFlags::ACK_REQUEST)),
                black_box(24),
                black_box(0x8001),
                black_box(42),
            )
        })
    });
    group.bench_function("encode_ack", |b| {
        b.iter(|| encode_ack(black_box(0x8001), black_box(42)))
    });
    group.finish();
}

/// Benchmarks walking and decoding the command blocks of a state frame.
fn bench_command_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_walk");
    for blocks in [1usize, 16, 64] {
        let frame = make_state_frame(blocks);
        let payload = &frame[HEADER_SIZE..];
        group.bench_with_input(BenchmarkId::new("blocks", blocks), &payload, |b, payload| {
            b.iter(|| {
                let mut decoded = 0usize;
                for block in CommandReader::new(black_box(payload)) {
                    if StateCommand::decode(&block).is_some() {
                        decoded += 1;
                    }
                }
                decoded
            })
        });
    }
    group.finish();
}

/// Benchmarks building an outbound bus change block.
fn bench_control_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_encode");
    group.bench_function("program_change", |b| {
        b.iter(|| ControlCommand::ProgramInput(black_box(5)).encode_block())
    });
    group.bench_function("cut", |b| b.iter(|| ControlCommand::Cut.encode_block()));
    group.finish();
}

criterion_group!(benches, bench_header, bench_command_walk, bench_control_encode);
criterion_main!(benches);
