use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fda_workbench::correlation::correlation_matrix;
use fda_workbench::{Column, Dataset, LinearDiscriminant};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::hint::black_box;

/// Gaussian clusters with shifted centres, seeded for reproducibility.
fn generate_class_data(
    n_samples: usize,
    n_features: usize,
    n_classes: usize,
    seed: u64,
) -> (Array2<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let labels: Vec<String> = (0..n_samples).map(|i| format!("c{}", i % n_classes)).collect();
    let data = Array2::from_shape_fn((n_samples, n_features), |(i, j)| {
        let class = i % n_classes;
        let shift = if j % n_classes == class { 3.0 } else { 0.0 };
        shift + noise.sample(&mut rng)
    });
    (data, labels)
}

fn dataset_from(data: &Array2<f64>) -> Dataset {
    let columns = data
        .columns()
        .into_iter()
        .enumerate()
        .map(|(j, column)| Column::from_f64(format!("f{}", j), &column.to_vec()))
        .collect();
    Dataset::new(columns).unwrap()
}

fn criterion_benchmark_runner(c: &mut Criterion) {
    let backend_name = if cfg!(feature = "backend_faer") { "faer" } else { "ndarray" };

    let scenarios = [
        ("Small", 150, 4, 3),
        ("Medium", 2000, 20, 5),
        ("Tall", 20000, 10, 4),
        ("Wide", 500, 200, 6),
    ];

    for (name, n_samples, n_features, n_classes) in scenarios {
        let (data, labels) = generate_class_data(n_samples, n_features, n_classes, 1234);
        let input_size_bytes = (n_samples * n_features * std::mem::size_of::<f64>()) as u64;
        let parameter = format!("{}_s{}_f{}_k{}_{}", name, n_samples, n_features, n_classes, backend_name);

        let mut fit_group = c.benchmark_group(format!("fit/{}", name));
        fit_group.sample_size(if n_samples * n_features > 100_000 { 10 } else { 50 });
        fit_group.throughput(Throughput::Bytes(input_size_bytes));
        fit_group.bench_with_input(BenchmarkId::new("fit", &parameter), &data, |b, data| {
            b.iter(|| LinearDiscriminant::fit(black_box(data.view()), &labels, 2, 1e-4).unwrap())
        });
        fit_group.finish();

        let model = LinearDiscriminant::fit(data.view(), &labels, 2, 1e-4).unwrap();
        let mut predict_group = c.benchmark_group(format!("predict/{}", name));
        predict_group.throughput(Throughput::Elements(n_samples as u64));
        predict_group.bench_with_input(BenchmarkId::new("predict_proba", &parameter), &data, |b, data| {
            b.iter(|| model.predict_proba(black_box(data.view())).unwrap())
        });
        predict_group.finish();

        let dataset = dataset_from(&data);
        let mut correlation_group = c.benchmark_group(format!("correlation/{}", name));
        correlation_group.sample_size(20);
        correlation_group.bench_function(BenchmarkId::new("correlation_matrix", &parameter), |b| {
            b.iter(|| correlation_matrix(black_box(&dataset), 2))
        });
        correlation_group.finish();
    }
}

criterion_group!(benches, criterion_benchmark_runner);
criterion_main!(benches);
