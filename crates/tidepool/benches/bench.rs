use core::hint::black_box;
use core::time::Duration;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::{sync::Arc, time::Instant};
use tidepool::{BoxJob, Loaded, Pool, PoolConfig, SeededRandom, ThreadRandom, power_of_two};
use tokio::runtime::Builder;

// Jobs submitted per benchmark iteration (per task for multi-task runs).
const TOTAL_JOBS: usize = 4096;

struct Fake {
    load: usize,
    capacity: usize,
}

impl Loaded for Fake {
    fn load(&self) -> usize {
        self.load
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Raw selector cost over a registry with mixed load.
fn bench_selector(c: &mut Criterion) {
    let candidates: Vec<_> = (0..64)
        .map(|i| Fake {
            load: i % 17,
            capacity: 16,
        })
        .collect();

    let mut group = c.benchmark_group("selector/power_of_two");
    group.throughput(Throughput::Elements(1));

    group.bench_function("thread_random", |b| {
        b.iter(|| black_box(power_of_two(black_box(&candidates), &ThreadRandom)));
    });

    let seeded = SeededRandom::new(42);
    group.bench_function("seeded", |b| {
        b.iter(|| black_box(power_of_two(black_box(&candidates), &seeded)));
    });

    group.finish();
}

/// Fast-path admission: capacity is never reached, so no caller ever waits.
fn bench_do_job_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/sequential/fast_path");
    group.throughput(Throughput::Elements(TOTAL_JOBS as u64));

    group.bench_function(format!("jobs/{TOTAL_JOBS}"), |b| {
        let rt = Builder::new_multi_thread()
            .enable_all()
            .worker_threads(1)
            .build()
            .unwrap();

        b.to_async(&rt).iter_custom(|iters| async move {
            let config = PoolConfig::new(4, TOTAL_JOBS, Duration::from_secs(30));
            let start = Instant::now();

            for _ in 0..iters {
                let pool = Pool::new(config).unwrap();
                for _ in 0..TOTAL_JOBS {
                    let admitted = pool.do_job(BoxJob::new(async {})).await;
                    black_box(admitted);
                }
                pool.shutdown().await;
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Many tasks submitting to one shared pool.
fn bench_do_job_contended(c: &mut Criterion) {
    for tasks in [2, 4, 8] {
        let mut group = c.benchmark_group(format!("pool/contended/tasks/{tasks}"));
        group.throughput(Throughput::Elements((TOTAL_JOBS * tasks) as u64));

        group.bench_function(format!("jobs/{TOTAL_JOBS}"), |b| {
            let rt = Builder::new_multi_thread()
                .enable_all()
                .worker_threads(tasks)
                .build()
                .unwrap();

            b.to_async(&rt).iter_custom(move |iters| async move {
                // Every worker can hold every job, so admission never waits.
                let config =
                    PoolConfig::new(tasks.max(2), TOTAL_JOBS * tasks, Duration::from_secs(30));
                let start = Instant::now();

                for _ in 0..iters {
                    let pool = Arc::new(Pool::new(config).unwrap());
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let pool = Arc::clone(&pool);
                            tokio::spawn(async move {
                                for _ in 0..TOTAL_JOBS {
                                    black_box(pool.do_job(BoxJob::new(async {})).await);
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                    pool.shutdown().await;
                }

                start.elapsed()
            });
        });

        group.finish();
    }
}

criterion_group!(
    benches,
    bench_selector,
    bench_do_job_sequential,
    bench_do_job_contended,
);
criterion_main!(benches);
