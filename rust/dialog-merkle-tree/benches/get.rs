use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dialog_merkle_tree::{Tree, TreeConfig};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

const BENCH_SEED: u64 = 42;

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    let mut rng = StdRng::seed_from_u64(BENCH_SEED);

    for size in [100u64, 1000, 10000] {
        let mut keys: Vec<u64> = (0..size).collect();
        keys.shuffle(&mut rng);

        let mut tree = Tree::<u64, u64>::new(TreeConfig::default()).unwrap();
        for key in &keys {
            tree.insert(*key, *key).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut found = 0;
                for key in &keys {
                    if tree.get(key).unwrap().is_some() {
                        found += 1;
                    }
                }
                found
            });
        });
    }

    group.finish();
}

fn bench_get_missing(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_missing");

    for size in [100u64, 1000, 10000] {
        let mut tree = Tree::<u64, u64>::new(TreeConfig::default()).unwrap();
        for key in 0..size {
            tree.insert(key * 2, key).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, size| {
            b.iter(|| (0..*size).filter(|key| tree.get(&(key * 2 + 1)).unwrap().is_none()).count());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_get, bench_get_missing);
criterion_main!(benches);
