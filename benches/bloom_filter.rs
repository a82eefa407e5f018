use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use scaling_filters::bloom::{BloomFilter, BloomOptions};

fn bench_insert(c: &mut Criterion) {
    let mut initial_items = 0;
    while initial_items < 1024 - 32 {
        c.bench_function(&format!("bloom insert {}", initial_items), |b| {
            b.iter_batched_ref(
                || {
                    let mut filter = BloomFilter::init(1024, 0.01, BloomOptions::none()).unwrap();
                    for i in 0..initial_items {
                        filter.add(&i).unwrap();
                    }
                    filter
                },
                |filter| filter.add(&0xDEAD_BEEFu32).unwrap(),
                BatchSize::PerIteration,
            )
        });
        initial_items += 32;
    }
}

criterion_group!(benches, bench_insert);
criterion_main!(benches);
