///! Performance benchmarks for role binding batches
///!
///! Run with: cargo bench --package warden-api

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use warden_api::kubernetes::memory::InMemoryCluster;
use warden_api::kubernetes::rbac::{delete_role_bindings, list_role_bindings};
use warden_api::kubernetes::AbsentBindingPolicy;
use warden_common::rbac::DeleteRequestBatch;

const NAMESPACES: usize = 10;

fn build_batch(per_namespace: usize) -> DeleteRequestBatch {
    let mut batch = DeleteRequestBatch::new();
    for ns in 0..NAMESPACES {
        batch.push(
            format!("team-{}", ns),
            (0..per_namespace).map(|i| format!("binding-{}", i)),
        );
    }
    batch
}

fn build_cluster(per_namespace: usize) -> InMemoryCluster {
    let mut cluster = InMemoryCluster::new(1);
    for ns in 0..NAMESPACES {
        for i in 0..per_namespace {
            cluster = cluster.with_binding(&format!("team-{}", ns), &format!("binding-{}", i), "view");
        }
    }
    cluster
}

/// Benchmark payload parsing for different batch sizes
fn bench_batch_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_parse");

    for size in [1usize, 10, 100].iter() {
        let json = serde_json::to_string(&build_batch(*size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, json| {
            b.iter(|| {
                let _: DeleteRequestBatch = serde_json::from_str(black_box(json)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark sequential deletion against a fresh in-memory cluster
fn bench_sequential_delete(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("sequential_delete");

    for size in [1usize, 10, 50].iter() {
        let batch = build_batch(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.to_async(&rt).iter_batched(
                || Arc::new(build_cluster(*size)),
                |cluster| async move {
                    delete_role_bindings(&*cluster, batch, AbsentBindingPolicy::Ignore)
                        .await
                        .unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark listing and conversion of every binding
fn bench_list_all(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cluster = build_cluster(100);
    let system_namespaces = vec!["kube-system".to_string()];

    c.bench_function("list_all_1000", |b| {
        b.to_async(&rt).iter(|| async {
            let items = list_role_bindings(&cluster, "", &system_namespaces)
                .await
                .unwrap();
            black_box(items);
        });
    });
}

criterion_group!(
    benches,
    bench_batch_parsing,
    bench_sequential_delete,
    bench_list_all
);
criterion_main!(benches);
