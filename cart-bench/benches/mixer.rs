use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cart_rng::{Stream, StreamVec, LANES};

const SEEDS: [&[u8]; LANES] = [
    b"AAAAAAAA", b"7SLMX2E9", b"ZZZZZZZZ", b"CART1234", b"Q2W3E4R5", b"NINELIVE", b"B4TCHMAN",
    b"99999999",
];

fn bench_scalar_draws(c: &mut Criterion) {
    let mut g = c.benchmark_group("stream_scalar");
    for &n in &[1_000u64, 100_000u64] {
        let s = Stream::new("rarity1", b"CART1234").unwrap();
        g.bench_with_input(BenchmarkId::new("draw_at", n), &n, |b, &n| {
            b.iter(|| {
                let mut acc = 0.0f64;
                for i in 0..n {
                    acc += s.draw_at(black_box(i));
                }
                black_box(acc)
            })
        });
    }
    g.finish();
}

fn bench_lane_draws(c: &mut Criterion) {
    let mut g = c.benchmark_group("stream_lanes");
    let v = StreamVec::new("rarity1", &SEEDS).unwrap();
    for &n in &[1_000u64, 100_000u64] {
        g.bench_with_input(BenchmarkId::new("draw_at_x8", n), &n, |b, &n| {
            b.iter(|| {
                let mut acc = 0.0f64;
                for i in 0..n {
                    acc += v.draw_at(black_box(i)).lane(0);
                }
                black_box(acc)
            })
        });
    }
    g.finish();
}

criterion_group!(benches, bench_scalar_draws, bench_lane_draws);
criterion_main!(benches);
