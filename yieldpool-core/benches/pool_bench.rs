//! Criterion benchmarks for pool hot paths.
//!
//! Benchmarks:
//! 1. Weighted split (pure arithmetic)
//! 2. Deposit across N strategies (split, adapter calls, mint)
//! 3. Withdrawal across N strategies (share computation, redemptions)
//! 4. Exchange-rate preview (aggregate valuation)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use yieldpool_core::allocation::split_by_weights;
use yieldpool_core::{HolderId, Pool, SimulatedVenue, StrategyIndex};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_pool(strategies: usize) -> Pool {
    let owner = HolderId::new("owner");
    let mut pool = Pool::with_max_strategies("owner", strategies);
    for i in 0..strategies {
        let venue = SimulatedVenue::new(format!("venue{i}"));
        pool.add_strategy(&owner, Box::new(venue), (i % 7 + 1) as i64)
            .unwrap();
    }
    pool
}

fn funded_pool(strategies: usize, holders: usize) -> Pool {
    let mut pool = make_pool(strategies);
    for h in 0..holders {
        pool.deposit(&HolderId::new(format!("h{h}")), 1_000_000)
            .unwrap();
    }
    pool
}

// ── 1. Weighted Split ────────────────────────────────────────────────

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_by_weights");

    for &n in &[4usize, 32, 256] {
        let weights: Vec<(StrategyIndex, u64)> =
            (0..n).map(|i| (StrategyIndex(i), (i % 5) as u64)).collect();
        group.bench_with_input(BenchmarkId::new("entries", n), &n, |b, _| {
            b.iter(|| split_by_weights(black_box(1_000_000_007), black_box(&weights)));
        });
    }

    group.finish();
}

// ── 2. Deposit ───────────────────────────────────────────────────────

fn bench_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit");

    for &n in &[1usize, 8, 32] {
        let mut pool = funded_pool(n, 4);
        let holder = HolderId::new("bench");
        group.bench_with_input(BenchmarkId::new("strategies", n), &n, |b, _| {
            b.iter(|| pool.deposit(black_box(&holder), black_box(10_000)).unwrap());
        });
    }

    group.finish();
}

// ── 3. Withdrawal ────────────────────────────────────────────────────

fn bench_withdraw(c: &mut Criterion) {
    let mut group = c.benchmark_group("withdraw");

    for &n in &[1usize, 8, 32] {
        let mut pool = funded_pool(n, 4);
        let holder = HolderId::new("bench");
        group.bench_with_input(BenchmarkId::new("deposit_then_withdraw", n), &n, |b, _| {
            b.iter(|| {
                let units = pool.deposit(&holder, 10_000).unwrap();
                pool.withdraw(black_box(&holder), black_box(units)).unwrap()
            });
        });
    }

    group.finish();
}

// ── 4. Rate Preview ──────────────────────────────────────────────────

fn bench_preview(c: &mut Criterion) {
    let pool = funded_pool(32, 16);
    c.bench_function("preview_exchange_rate_32", |b| {
        b.iter(|| black_box(&pool).preview_exchange_rate().unwrap());
    });
}

criterion_group!(
    benches,
    bench_split,
    bench_deposit,
    bench_withdraw,
    bench_preview,
);
criterion_main!(benches);
