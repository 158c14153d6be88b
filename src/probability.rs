//! Categorical and Bernoulli sampling over score vectors.
//!
//! Scores are turned into a normalised distribution and then into *lower*
//! cumulative bounds: `[1, 1, 1, 1]` becomes `[0.0, 0.25, 0.5, 0.75]`. An
//! outcome is the last index whose lower bound does not exceed the uniform
//! draw, which is the same as picking the first candidate whose upper bound
//! exceeds it.

use rand::Rng;

use crate::error::{ConfigError, Result};

/// Normalise non-negative scores so they sum to one.
///
/// Fails with [`ConfigError::DegenerateScores`] when there is no positive
/// mass to distribute, or when any score is negative or not finite.
pub fn normalise(scores: &[f64]) -> Result<Vec<f64>> {
    if scores.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(ConfigError::DegenerateScores);
    }
    let sum: f64 = scores.iter().sum();
    if sum <= 0.0 {
        return Err(ConfigError::DegenerateScores);
    }
    Ok(scores.iter().map(|s| s / sum).collect())
}

/// Normalise scores and return the lower cumulative bound of each entry.
pub fn to_normalised_cumulative(scores: &[f64]) -> Result<Vec<f64>> {
    let normalised = normalise(scores)?;
    let mut running = 0.0;
    Ok(normalised
        .into_iter()
        .map(|p| {
            let lower = running;
            running += p;
            lower
        })
        .collect())
}

/// Index selected by the uniform value `r` in a lower-bound cumulative table.
///
/// Zero-width entries share their lower bound with the next entry and are
/// never selected.
pub fn cumulative_outcome(r: f64, cumulative: &[f64]) -> usize {
    let mut selected = 0;
    for (index, &lower) in cumulative.iter().enumerate() {
        if r < lower {
            break;
        }
        selected = index;
    }
    selected
}

/// Draw an index from `scores` with probability proportional to each score.
pub fn decide_outcome<R: Rng + ?Sized>(rng: &mut R, scores: &[f64]) -> Result<usize> {
    let cumulative = to_normalised_cumulative(scores)?;
    let r: f64 = rng.gen();
    Ok(cumulative_outcome(r, &cumulative))
}

/// Draw a key from ordered `(key, weight)` pairs.
pub fn decide_keyed<R, K>(rng: &mut R, weighted: &[(K, f64)]) -> Result<K>
where
    R: Rng + ?Sized,
    K: Clone,
{
    let weights: Vec<f64> = weighted.iter().map(|(_, w)| *w).collect();
    let index = decide_outcome(rng, &weights)?;
    Ok(weighted[index].0.clone())
}

/// Bernoulli trial: true with probability `p`.
///
/// Probabilities outside `[0, 1]` saturate instead of panicking.
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    let r: f64 = rng.gen();
    r < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn cumulative_of_uniform_scores() {
        let cd = to_normalised_cumulative(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let expected = [0.0, 0.25, 0.5, 0.75];
        for (got, want) in cd.iter().zip(expected) {
            assert_approx_eq!(*got, want);
        }
    }

    #[test]
    fn normalise_sums_to_one() {
        let n = normalise(&[2.0, 6.0]).unwrap();
        assert_approx_eq!(n[0], 0.25);
        assert_approx_eq!(n[1], 0.75);
    }

    #[test]
    fn all_zero_scores_are_degenerate() {
        assert!(matches!(
            normalise(&[0.0, 0.0]),
            Err(ConfigError::DegenerateScores)
        ));
    }

    #[test]
    fn negative_scores_are_degenerate() {
        assert!(normalise(&[1.0, -0.5]).is_err());
    }

    #[test]
    fn empty_scores_are_degenerate() {
        assert!(decide_outcome(&mut ChaCha8Rng::seed_from_u64(1), &[]).is_err());
    }

    #[test]
    fn outcome_boundaries() {
        let cd = [0.0, 0.25, 0.5, 0.75];
        assert_eq!(cumulative_outcome(0.0, &cd), 0);
        assert_eq!(cumulative_outcome(0.2499, &cd), 0);
        assert_eq!(cumulative_outcome(0.25, &cd), 1);
        assert_eq!(cumulative_outcome(0.74, &cd), 2);
        assert_eq!(cumulative_outcome(0.99, &cd), 3);
    }

    #[test]
    fn zero_weight_entries_are_skipped() {
        let cd = to_normalised_cumulative(&[0.0, 1.0, 0.0]).unwrap();
        for r in [0.0, 0.3, 0.6, 0.999] {
            assert_eq!(cumulative_outcome(r, &cd), 1);
        }
    }

    #[test]
    fn uniform_sampling_frequencies() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = [0usize; 4];
        for _ in 0..1000 {
            let i = decide_outcome(&mut rng, &[1.0, 1.0, 1.0, 1.0]).unwrap();
            counts[i] += 1;
        }
        for count in counts {
            assert!((200..=300).contains(&count), "count {count} out of range");
        }
    }

    #[test]
    fn keyed_draw_returns_only_weighted_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let table = [("a", 0.0), ("b", 2.0), ("c", 0.0)];
        for _ in 0..50 {
            assert_eq!(decide_keyed(&mut rng, &table).unwrap(), "b");
        }
    }

    #[test]
    fn bernoulli_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(!bernoulli(&mut rng, 0.0));
            assert!(bernoulli(&mut rng, 1.0));
        }
    }
}
