use criterion::{criterion_group, criterion_main, Criterion};


criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = rlwe::criterion_benchmark
}
criterion_main!(benches);
