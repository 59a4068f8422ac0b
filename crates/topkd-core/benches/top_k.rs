// Ranked-set backend benchmark - measure update_if_greater throughput
//
// Compares the B-tree backend against the linear-scan backend under a
// steady stream of updates over a key space larger than the capacity.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use topkd_core::{RankedItem, TopKBTreeItems, TopKItems, TopKScanItems};

const UPDATES: usize = 10_000;

fn generate_updates(key_space: usize) -> Vec<RankedItem> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..UPDATES)
        .map(|_| {
            let id = rng.gen_range(0..key_space);
            RankedItem::new(format!("item-{id:06}"), rng.gen_range(1..1_000_000))
        })
        .collect()
}

fn bench_update_if_greater(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_if_greater");
    group.throughput(Throughput::Elements(UPDATES as u64));

    for &max_size in &[100usize, 1_000] {
        let updates = generate_updates(max_size * 4);

        group.bench_with_input(
            BenchmarkId::new("btree", max_size),
            &updates,
            |b, updates| {
                b.iter(|| {
                    let mut items = TopKBTreeItems::new(max_size);
                    for update in updates {
                        items.update_if_greater(update.clone());
                    }
                    black_box(items.get_items(10));
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("scan", max_size),
            &updates,
            |b, updates| {
                b.iter(|| {
                    let mut items = TopKScanItems::new(max_size);
                    for update in updates {
                        items.update_if_greater(update.clone());
                    }
                    black_box(items.get_items(10));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_update_if_greater);
criterion_main!(benches);
