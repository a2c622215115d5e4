// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Shuffles samples once and cuts them into three sets:
//   - train: updates the weights
//   - valid: evaluated every few steps to draw learning curves
//   - test:  scored once at the end of training
//
// Parallel corpora are often sorted (by source file, by length,
// by domain), so the shuffle happens before any cut.
//
// A seeded StdRng keeps the split identical between runs, which
// matters when a run is resumed or compared against another.
//
// Reference: rand crate documentation (SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

#[derive(Debug)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub valid: Vec<T>,
    pub test:  Vec<T>,
}

/// Shuffle `samples` with `seed` and split by fraction.
///
/// `valid_fraction + test_fraction` must not exceed 1.0; whatever is
/// left over becomes the training set.
pub fn split_train_valid_test<T>(
    mut samples:    Vec<T>,
    valid_fraction: f64,
    test_fraction:  f64,
    seed:           u64,
) -> Splits<T> {
    assert!(
        valid_fraction >= 0.0 && test_fraction >= 0.0 && valid_fraction + test_fraction <= 1.0,
        "invalid split fractions: valid={valid_fraction}, test={test_fraction}"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total   = samples.len();
    let n_test  = ((total as f64) * test_fraction).round() as usize;
    let n_valid = (((total as f64) * valid_fraction).round() as usize).min(total - n_test.min(total));

    let test  = samples.split_off(total - n_test.min(total));
    let valid = samples.split_off(samples.len() - n_valid);

    tracing::debug!(
        "Dataset split: {} train, {} valid, {} test",
        samples.len(),
        valid.len(),
        test.len(),
    );

    Splits { train: samples, valid, test }
}
