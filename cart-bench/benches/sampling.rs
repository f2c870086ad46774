use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cart_core::{Deck, PoolSet, Source, Stake};
use cart_core::{BossKeys, JokerKeys, VoucherKeys};
use cart_rng::{StreamBank, StreamPlan, LANES};

const SEEDS: [&[u8]; LANES] = [
    b"AAAAAAAA", b"7SLMX2E9", b"ZZZZZZZZ", b"CART1234", b"Q2W3E4R5", b"NINELIVE", b"B4TCHMAN",
    b"99999999",
];

fn bench_joker_kernel(c: &mut Criterion) {
    let pools = PoolSet::for_run(Deck::Red, Stake::White);
    let mut plan = StreamPlan::new();
    let keys = JokerKeys::declare(&mut plan, Source::Shop, 2).unwrap();
    plan.freeze();
    let bank = StreamBank::build(&plan, &SEEDS);

    c.bench_function("joker_shop_slot_x8", |b| {
        b.iter(|| {
            for slot in 0..6u64 {
                black_box(keys.sample(&bank, &pools, black_box(slot)));
            }
        })
    });
}

fn bench_voucher_kernel(c: &mut Criterion) {
    let pools = PoolSet::for_run(Deck::Red, Stake::White);
    let mut plan = StreamPlan::new();
    let keys = VoucherKeys::declare(&mut plan, 1).unwrap();
    plan.freeze();
    let bank = StreamBank::build(&plan, &SEEDS);

    c.bench_function("voucher_x8", |b| {
        b.iter(|| black_box(keys.sample(&bank, &pools)))
    });
}

fn bench_boss_schedule(c: &mut Criterion) {
    let mut plan = StreamPlan::new();
    let keys = BossKeys::declare(&mut plan).unwrap();
    plan.freeze();
    let bank = StreamBank::build(&plan, &SEEDS);

    c.bench_function("boss_schedule_x8", |b| {
        b.iter(|| black_box(keys.schedule(&bank)))
    });
}

criterion_group!(
    benches,
    bench_joker_kernel,
    bench_voucher_kernel,
    bench_boss_schedule
);
criterion_main!(benches);
