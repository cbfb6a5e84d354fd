use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use quickpoint_core::{decode, encode, transition, Intent, Position, StepCounts};

fn bench_deck() -> StepCounts {
    // 200 slides, every third one with four reveal steps.
    StepCounts((0..200).map(|i| if i % 3 == 0 { 4 } else { 0 }).collect())
}

fn bench_walk_deck(c: &mut Criterion) {
    let mut group = c.benchmark_group("Navigation");
    let deck = bench_deck();
    group.throughput(Throughput::Elements(1));

    group.bench_function("advance_full_deck", |b| {
        b.iter(|| {
            let mut position = Position::START;
            loop {
                let next = transition(position, black_box(Intent::Advance), &deck);
                if next == position {
                    break;
                }
                position = next;
            }
            black_box(position);
        })
    });

    group.bench_function("jump_clamped", |b| {
        b.iter(|| {
            black_box(transition(
                Position::START,
                black_box(Intent::JumpTo { slide: 10_000, step: 99 }),
                &deck,
            ))
        })
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("Location Codec");
    let deck = bench_deck();
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode", |b| {
        b.iter(|| black_box(encode(black_box(Position::new(150, Some(2))))))
    });

    group.bench_function("decode_noisy", |b| {
        b.iter(|| {
            black_box(decode(
                black_box("index.html?receiver=false#slide-151-step-3"),
                &deck,
            ))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_walk_deck, bench_codec);
criterion_main!(benches);
