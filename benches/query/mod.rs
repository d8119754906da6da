use std::hint::black_box;

use centered_interval_tree::{ConcurrentIntervalTree, Interval, IntervalTree};
use criterion::{
    measurement::Measurement, BatchSize, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};

use crate::Lfsr;

const N_QUERIES: usize = 100;

#[derive(Debug)]
struct BenchName {
    bench_name: &'static str,
    n_values: usize,
}

impl From<BenchName> for BenchmarkId {
    fn from(v: BenchName) -> Self {
        Self::new(format!("{}/n_values", v.bench_name), v.n_values)
    }
}

pub(super) fn bench(c: &mut Criterion) {
    let mut g = c.benchmark_group("query");

    for n_values in [100, 1_000, 10_000] {
        bench_param(&mut g, n_values)
    }
}

fn bench_param<M>(g: &mut BenchmarkGroup<'_, M>, n_values: usize)
where
    M: Measurement,
{
    let mut rand = Lfsr::default();
    let intervals = (0..n_values).map(|_| rand.next_interval()).collect::<Vec<_>>();

    let t = intervals.iter().cloned().collect::<IntervalTree<_>>();
    let c = intervals.into_iter().collect::<ConcurrentIntervalTree<_>>();

    bench_query_point(n_values, g, &t);
    bench_query_range(n_values, g, &t);
    bench_concurrent_query_point(n_values, g, &c);
    bench_concurrent_query_range(n_values, g, &c);
}

/// Generate a benchmark running [`N_QUERIES`] calls of `$method` against
/// `$tree`, with arguments derived from the LFSR by `$arg`.
macro_rules! query_bench {
    (
        $name:ident,
        $tree:ty,
        $method:ident,
        $arg:expr
    ) => {
        paste::paste! {
            fn [<bench_ $name>]<M>(n_values: usize, g: &mut BenchmarkGroup<M>, t: &$tree)
            where
                M: Measurement,
            {
                let bench_name = BenchName {
                    n_values,
                    bench_name: stringify!($name),
                };

                g.throughput(Throughput::Elements(N_QUERIES as _));
                // Queries per second
                g.bench_function(BenchmarkId::from(bench_name), |b| {
                    b.iter_batched(
                        Lfsr::default,
                        |mut rand| {
                            for _ in 0..N_QUERIES {
                                let arg = $arg(&mut rand);
                                black_box(t.$method(&arg));
                            }
                        },
                        BatchSize::SmallInput,
                    )
                });
            }
        }
    };
}

fn next_point(rand: &mut Lfsr) -> u16 {
    rand.next()
}

fn next_window(rand: &mut Lfsr) -> Interval<u16> {
    let start = rand.next();
    Interval::closed(start, start.saturating_add(100))
}

query_bench!(query_point, IntervalTree<u16>, query_point, next_point);
query_bench!(query_range, IntervalTree<u16>, query_range, next_window);
query_bench!(concurrent_query_point, ConcurrentIntervalTree<u16>, query_point, next_point);
query_bench!(concurrent_query_range, ConcurrentIntervalTree<u16>, query_range, next_window);
