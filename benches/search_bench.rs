//! Benchmarks for brute-force search

use bruteforce_knn::{BruteForceSearcher, TopKSelector, Vector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn create_random_vectors(n: usize, dim: usize) -> Vec<Vector> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rand::random::<f32>()).collect();
            Vector::new(data)
        })
        .collect()
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let searcher = BruteForceSearcher::euclidean();
    let query = Vector::new(vec![0.5; 128]);

    for size in [100, 1000, 10000].iter() {
        let database = create_random_vectors(*size, 128);

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| searcher.search(black_box(&database), black_box(&query), 10).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("sharded", size), size, |b, _| {
            b.iter(|| {
                searcher
                    .search_parallel(black_box(&database), black_box(&query), 10, 8)
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_selector(c: &mut Criterion) {
    let distances: Vec<f32> = (0..100_000).map(|_| rand::random::<f32>()).collect();
    let mut group = c.benchmark_group("top_k");

    for k in [1, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            b.iter(|| {
                let mut selector = TopKSelector::new(k).unwrap();
                for (i, &d) in distances.iter().enumerate() {
                    selector.offer(i, d).unwrap();
                }
                selector.drain()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_search, benchmark_selector);
criterion_main!(benches);
