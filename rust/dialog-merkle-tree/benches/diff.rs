use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dialog_merkle_tree::{Tree, TreeConfig};

fn populated(size: u64) -> Tree<u64, u64> {
    let mut tree = Tree::new(TreeConfig::default()).unwrap();
    for key in 0..size {
        tree.insert(key, key).unwrap();
    }
    tree
}

fn bench_diff_single_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_single_change");

    for size in [100u64, 1000, 10000, 100000] {
        let ours = populated(size);
        let mut theirs = ours.clone();
        theirs.replace(&(size / 2), 0).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ours.diff(&theirs).unwrap().len());
        });
    }

    group.finish();
}

fn bench_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("changes");

    for size in [100u64, 1000, 10000] {
        let ours = populated(size);
        let mut theirs = ours.clone();
        for key in (0..size).step_by(10) {
            theirs.remove(&key).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ours.changes(&theirs).len());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff_single_change, bench_changes);
criterion_main!(benches);
