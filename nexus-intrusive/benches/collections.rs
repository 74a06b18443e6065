//! Benchmarks for the intrusive collections.
//!
//! Each structure runs against a pre-filled storage, so only link rewriting
//! is measured. Std collections that own their values are included for
//! scale.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nexus_intrusive::{
    adapter, BoxedStorage, Heap, HeapLink, Queue, QueueLink, Storage, Table, TableLink, Tree,
    TreeLink,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::cmp::Reverse;

struct Order {
    id: u64,
    price: u64,
    by_price: HeapLink<u32>,
    book: TreeLink<u32>,
    by_id: TableLink<u32>,
    pending: QueueLink<u32>,
}

adapter! {
    struct ByPrice: Order => by_price: HeapLink<u32>, key price: u64;
}
adapter! {
    struct Book: Order => book: TreeLink<u32>, key price: u64;
}
adapter! {
    struct ById: Order => by_id: TableLink<u32>, key id: u64;
}
adapter! {
    struct Pending: Order => pending: QueueLink<u32>, key price: u64;
}

const SIZES: [usize; 3] = [64, 1024, 16384];

fn fill(n: usize, rng: &mut SmallRng) -> (BoxedStorage<Order>, Vec<u32>) {
    let mut storage = BoxedStorage::with_capacity(n);
    let ids = (0..n as u64)
        .map(|id| {
            storage
                .try_insert(Order {
                    id,
                    price: rng.gen_range(0..1_000_000),
                    by_price: HeapLink::new(),
                    book: TreeLink::new(),
                    by_id: TableLink::new(),
                    pending: QueueLink::new(),
                })
                .unwrap()
        })
        .collect();
    (storage, ids)
}

// ============================================================================
// Heap
// ============================================================================

fn bench_heap(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_cycle");
    let mut rng = SmallRng::seed_from_u64(1);

    for n in SIZES {
        let (mut storage, ids) = fill(n, &mut rng);
        let mut heap: Heap<u32, ByPrice> = Heap::new();
        for &t in &ids {
            heap.inhume(&mut storage, t);
        }

        // Exhume the min and put it straight back: steady-state size.
        group.bench_with_input(BenchmarkId::new("nexus", n), &n, |b, _| {
            b.iter(|| {
                let t = heap.exhume(&mut storage).unwrap();
                heap.inhume(&mut storage, black_box(t));
            });
        });
        heap.clear(&mut storage);

        let mut std_heap: BinaryHeap<Reverse<u64>> =
            (0..n).map(|_| Reverse(rng.gen_range(0..1_000_000))).collect();
        group.bench_with_input(BenchmarkId::new("std_binary_heap", n), &n, |b, _| {
            b.iter(|| {
                let v = std_heap.pop().unwrap();
                std_heap.push(black_box(v));
            });
        });
    }
    group.finish();
}

fn bench_heap_decrease(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_decrease_key");
    let mut rng = SmallRng::seed_from_u64(2);

    for n in SIZES {
        let (mut storage, ids) = fill(n, &mut rng);
        let mut heap: Heap<u32, ByPrice> = Heap::new();
        for &t in &ids {
            heap.inhume(&mut storage, t);
        }

        group.bench_with_input(BenchmarkId::new("churn", n), &n, |b, _| {
            b.iter(|| {
                let t = ids[rng.gen_range(0..ids.len())];
                let order = storage.get_mut(t).unwrap();
                order.price = order.price.saturating_sub(1);
                black_box(heap.churn(&mut storage, t));
            });
        });
        heap.clear(&mut storage);
    }
    group.finish();
}

// ============================================================================
// Tree
// ============================================================================

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_prune_graft");
    let mut rng = SmallRng::seed_from_u64(3);

    for n in SIZES {
        let (mut storage, ids) = fill(n, &mut rng);
        let mut tree: Tree<u32, Book> = Tree::new();
        for &t in &ids {
            tree.graft(&mut storage, t);
        }

        group.bench_with_input(BenchmarkId::new("nexus", n), &n, |b, _| {
            b.iter(|| {
                let t = ids[rng.gen_range(0..ids.len())];
                tree.prune(&mut storage, t);
                tree.graft(&mut storage, black_box(t));
            });
        });
        tree.clear(&mut storage);

        let mut keys: Vec<u64> = (0..n as u64).collect();
        let mut set: BTreeSet<u64> = keys.iter().copied().collect();
        keys.shuffle(&mut rng);
        group.bench_with_input(BenchmarkId::new("std_btree_set", n), &n, |b, _| {
            b.iter(|| {
                let k = keys[rng.gen_range(0..keys.len())];
                set.remove(&k);
                set.insert(black_box(k));
            });
        });
    }
    group.finish();
}

// ============================================================================
// Table
// ============================================================================

fn bench_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_get");
    let mut rng = SmallRng::seed_from_u64(4);

    for n in SIZES {
        let (mut storage, ids) = fill(n, &mut rng);
        let mut table: Table<u32, ById> = Table::with_buckets(n);
        for &t in &ids {
            table.set(&mut storage, t);
        }

        group.bench_with_input(BenchmarkId::new("nexus", n), &n, |b, _| {
            b.iter(|| {
                let id = rng.gen_range(0..n as u64);
                black_box(table.get(&mut storage, &id))
            });
        });
        table.clear(&mut storage);

        let map: HashMap<u64, usize> = (0..n as u64).map(|k| (k, k as usize)).collect();
        group.bench_with_input(BenchmarkId::new("std_hash_map", n), &n, |b, _| {
            b.iter(|| {
                let id = rng.gen_range(0..n as u64);
                black_box(map.get(&id))
            });
        });
    }
    group.finish();
}

// ============================================================================
// Queue
// ============================================================================

fn bench_queue_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_sort");
    let mut rng = SmallRng::seed_from_u64(5);

    for n in SIZES {
        let (mut storage, mut ids) = fill(n, &mut rng);
        let mut queue: Queue<u32, Pending> = Queue::new();

        group.bench_with_input(BenchmarkId::new("nexus", n), &n, |b, _| {
            b.iter(|| {
                ids.shuffle(&mut rng);
                for &t in &ids {
                    queue.enqueue(&mut storage, t);
                }
                queue.sort(&mut storage);
                queue.clear(&mut storage);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_heap,
    bench_heap_decrease,
    bench_tree,
    bench_table,
    bench_queue_sort
);
criterion_main!(benches);
