use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use creditrisk::ml::forest::{ForestDataset, ForestOptions, train_random_forest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FEATURE_COUNT: usize = 6;

fn synthetic_dataset(rows: usize) -> ForestDataset {
    let mut rng = StdRng::seed_from_u64(7);
    let mut x = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);
    for _ in 0..rows {
        let row: Vec<f64> = (0..FEATURE_COUNT)
            .map(|_| rng.random_range(0.0..1_000.0))
            .collect();
        y.push(usize::from(row[0] + row[1] > 1_200.0));
        x.push(row);
    }
    ForestDataset {
        classes: vec!["0".to_string(), "1".to_string()],
        x,
        y,
    }
}

fn bench_forest_fit(c: &mut Criterion) {
    let options = ForestOptions {
        n_trees: 20,
        ..ForestOptions::default()
    };
    for rows in [500usize, 2_000] {
        let dataset = synthetic_dataset(rows);
        c.bench_with_input(
            BenchmarkId::new("forest_fit", rows),
            &dataset,
            |b, dataset| {
                b.iter(|| {
                    train_random_forest(black_box(dataset), &options).expect("forest fit");
                });
            },
        );
    }
}

fn bench_forest_predict(c: &mut Criterion) {
    let dataset = synthetic_dataset(2_000);
    let model = train_random_forest(&dataset, &ForestOptions::default()).expect("forest fit");
    c.bench_with_input(
        BenchmarkId::new("forest_predict", dataset.x.len()),
        &dataset.x,
        |b, rows| {
            b.iter(|| {
                rows.iter()
                    .map(|row| model.predict_class_index(black_box(row)))
                    .sum::<usize>()
            });
        },
    );
}

criterion_group!(benches, bench_forest_fit, bench_forest_predict);
criterion_main!(benches);
