// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Shuffles rows with a seeded RNG and splits them into a
// training set and a held-out test set.
//
// Same seed + same input = same split, on every run. The
// round-trip check depends on that: the native model and the
// reloaded ONNX model must be scored on identical rows.
//
// Sizes follow the usual convention:
//   n_test  = ceil(n * test_fraction)
//   n_train = n - n_test
// The first n_test shuffled rows form the test set.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Number of rows that go to the test set for `total` rows.
pub fn test_size(total: usize, test_fraction: f64) -> usize {
    let fraction = test_fraction.clamp(0.0, 1.0);
    ((total as f64) * fraction).ceil() as usize
}

/// Deterministically shuffle `samples` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total  = samples.len();
    let n_test = test_size(total, test_fraction).min(total);

    // split_off(n) leaves [0..n) in `samples` and returns the rest
    let train = samples.split_off(n_test);
    let test  = samples;

    tracing::debug!(
        "Dataset split (seed {}): {} train, {} test",
        seed,
        train.len(),
        test.len(),
    );

    (train, test)
}
