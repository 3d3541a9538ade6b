//! Criterion micro-benchmarks for simultaneous-move resolution.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use posgrid_bench::{pillar_arena, random_directions, scatter};
use posgrid_core::seeded_rng;
use posgrid_grid::{CollisionResolver, MovementRules};

/// Benchmark: resolve one tick for 4, 32 and 128 agents on a 32x32 arena.
fn bench_resolve(c: &mut Criterion) {
    let grid = pillar_arena(32).unwrap();
    let resolver = CollisionResolver::default();
    let mut group = c.benchmark_group("resolve");
    for n in [4usize, 32, 128] {
        let current = scatter(&grid, n, 42).unwrap();
        let mut rng = seeded_rng(42);
        let batches: Vec<_> = (0..64).map(|_| random_directions(n, &mut rng)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            let mut i = 0;
            b.iter(|| {
                let res = resolver.resolve(&grid, &current, &batches[i % batches.len()]);
                i += 1;
                std::hint::black_box(res);
            });
        });
    }
    group.finish();
}

/// Benchmark: swap blocking and shared-cell rejection disabled.
fn bench_resolve_permissive(c: &mut Criterion) {
    let grid = pillar_arena(32).unwrap();
    let resolver = CollisionResolver::new(MovementRules {
        agent_collisions: false,
        block_swaps: false,
        ..MovementRules::default()
    })
    .unwrap();
    let current = scatter(&grid, 128, 42).unwrap();
    let dirs = random_directions(128, &mut seeded_rng(42));
    c.bench_function("resolve_permissive_128", |b| {
        b.iter(|| std::hint::black_box(resolver.resolve(&grid, &current, &dirs)));
    });
}

/// Benchmark: action noise for 128 agents.
fn bench_perturb(c: &mut Criterion) {
    let resolver = CollisionResolver::new(MovementRules {
        action_probs: 0.9,
        ..MovementRules::default()
    })
    .unwrap();
    let mut rng = seeded_rng(42);
    let mut actions = vec![0usize; 128];
    c.bench_function("perturb_128", |b| {
        b.iter(|| {
            resolver.perturb_actions(&mut actions, 5, &mut rng);
            std::hint::black_box(&actions);
        });
    });
}

criterion_group!(benches, bench_resolve, bench_resolve_permissive, bench_perturb);
criterion_main!(benches);
