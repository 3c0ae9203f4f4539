use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::titer_queries::titer_query_benchmarks;

criterion_group!(immunity_benches, titer_query_benchmarks,);

criterion_main!(immunity_benches);
