//! Seeded train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Disjoint row indices for fitting and evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_fraction * n_rows)` rows.
///
/// The test rows are the head of the permutation and the training rows the
/// rest. Labels are ignored, so the split is not stratified.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<Partition, String> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(format!("test fraction {test_fraction} is not in (0, 1)"));
    }
    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(format!(
            "{n_rows} rows with test fraction {test_fraction} leaves an empty partition \
             (train={n_train}, test={n_test})"
        ));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = indices.split_off(n_test);
    Ok(Partition {
        train,
        test: indices,
    })
}
