//! Benchmarks for exhaustive flat search at catalog scale.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use platelens_core::index::SlotIndex;
use platelens_core::vector::normalize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIM: usize = 512;

fn random_unit_vector(rng: &mut StdRng) -> Vec<f32> {
    let mut v: Vec<f32> = (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
    normalize(&mut v);
    v
}

fn build_index(rng: &mut StdRng, size: usize) -> SlotIndex {
    let mut index = SlotIndex::new(DIM);
    for _ in 0..size {
        index.append(random_unit_vector(rng)).unwrap();
    }
    index
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");

    for size in [100, 1_000, 5_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let index = build_index(&mut rng, size);
        let query = random_unit_vector(&mut rng);

        group.bench_with_input(BenchmarkId::new("top3", size), &size, |b, _| {
            b.iter(|| index.search(black_box(&query), 3).unwrap())
        });
    }

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let vector = random_unit_vector(&mut rng);

    c.bench_function("append_512d", |b| {
        let mut index = SlotIndex::new(DIM);
        b.iter(|| index.append(black_box(vector.clone())).unwrap())
    });
}

criterion_group!(benches, bench_search, bench_append);
criterion_main!(benches);
