// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Optionally carves a validation set out of the annotations.
//
// The default run trains on the full annotation file, in file
// order. A validation split is only made when a fraction below
// 1.0 is requested; the shuffle is seeded so the same seed
// always yields the same split and the held-out heads never
// leak into training across resumed experiments.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction >= 1.0` returns every sample for training, in the
/// original order.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    if train_fraction >= 1.0 {
        return (samples, Vec::new());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.max(0.0)).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
