use std::thread;

use centered_interval_tree::{ConcurrentIntervalTree, IntervalTree};
use criterion::{
    measurement::Measurement, BatchSize, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};

use crate::Lfsr;

const THREADS: usize = 4;

#[derive(Debug, Clone, Copy)]
struct BenchName {
    bench: &'static str,
    n_values: usize,
}

impl From<BenchName> for BenchmarkId {
    fn from(v: BenchName) -> Self {
        Self::new(format!("{}/n_values", v.bench), v.n_values)
    }
}

pub(super) fn bench(c: &mut Criterion) {
    let mut g = c.benchmark_group("insert");

    for n_values in [1, 100, 1_000, 10_000] {
        bench_sequential(&mut g, n_values);
        bench_concurrent(&mut g, n_values);
    }
}

/// Measure the time needed to insert `n_values` number of randomly generated
/// intervals into an empty tree.
fn bench_sequential<M>(g: &mut BenchmarkGroup<'_, M>, n_values: usize)
where
    M: Measurement,
{
    let bench_name = BenchName {
        bench: "sequential",
        n_values,
    };
    g.throughput(Throughput::Elements(n_values as _)); // Intervals inserted per second
    g.bench_function(BenchmarkId::from(bench_name), |b| {
        b.iter_batched(
            || (IntervalTree::default(), Lfsr::default()),
            |(mut t, mut rand)| {
                for _i in 0..n_values {
                    t.insert(rand.next_interval());
                }
                t
            },
            BatchSize::PerIteration,
        );
    });
}

/// Measure the time needed for [`THREADS`] threads to insert `n_values`
/// randomly generated intervals between them into an empty concurrent tree.
fn bench_concurrent<M>(g: &mut BenchmarkGroup<'_, M>, n_values: usize)
where
    M: Measurement,
{
    let mut rand = Lfsr::default();
    let intervals = (0..n_values).map(|_| rand.next_interval()).collect::<Vec<_>>();

    let bench_name = BenchName {
        bench: "concurrent",
        n_values,
    };
    g.throughput(Throughput::Elements(n_values as _)); // Intervals inserted per second
    g.bench_function(BenchmarkId::from(bench_name), |b| {
        b.iter_batched(
            ConcurrentIntervalTree::default,
            |t| {
                thread::scope(|s| {
                    for shard in intervals.chunks(n_values / THREADS + 1) {
                        let t = &t;
                        s.spawn(move || {
                            for v in shard {
                                t.insert(v.clone());
                            }
                        });
                    }
                });
                t
            },
            BatchSize::PerIteration,
        );
    });
}
