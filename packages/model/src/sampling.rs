//! Seeded random oversampling for class balance.

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

/// Returns row indices of a class-balanced sample.
///
/// Every row of the majority class is kept once, in input order, followed
/// by the minority rows drawn with replacement until both classes have the
/// same count. When the classes are already balanced the input order is
/// returned unchanged. The draw is fully determined by `seed`.
///
/// Callers must ensure both classes are present.
#[must_use]
pub fn oversample_minority(labels: &[bool], seed: u64) -> Vec<usize> {
    let positives: Vec<usize> = (0..labels.len()).filter(|&i| labels[i]).collect();
    let negatives: Vec<usize> = (0..labels.len()).filter(|&i| !labels[i]).collect();

    if positives.len() == negatives.len() || positives.is_empty() || negatives.is_empty() {
        return (0..labels.len()).collect();
    }

    let (majority, minority) = if positives.len() > negatives.len() {
        (positives, negatives)
    } else {
        (negatives, positives)
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = majority.clone();
    sample.extend((0..majority.len()).map(|_| minority[rng.random_range(0..minority.len())]));
    sample
}
