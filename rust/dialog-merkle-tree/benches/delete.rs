use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use dialog_merkle_tree::{Tree, TreeConfig};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

const BENCH_SEED: u64 = 42;

fn populated(size: u64) -> Tree<u64, u64> {
    let mut tree = Tree::new(TreeConfig::default()).unwrap();
    for key in 0..size {
        tree.insert(key, key).unwrap();
    }
    tree
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);

    for size in [100u64, 1000, 10000] {
        let tree = populated(size);
        let mut keys: Vec<u64> = (0..size).collect();
        keys.shuffle(&mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| {
                    for key in &keys {
                        tree.remove(key).unwrap();
                    }
                    tree
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_delete_half(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_half");

    for size in [100u64, 1000, 10000] {
        let tree = populated(size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, size| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| {
                    for key in (0..*size).step_by(2) {
                        tree.remove(&key).unwrap();
                    }
                    tree.digest()
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_delete, bench_delete_half);
criterion_main!(benches);
