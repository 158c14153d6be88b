//! Candidate scoring — tactus distance, metrical prominence, density and
//! entropy.
//!
//! A raw score mixes how close a candidate's level is to the tactus with how
//! prominent its position is. Density then favours deep or shallow levels;
//! entropy pulls every score toward the middle, flattening the distribution.

use crate::config::RhythmTables;

/// Midpoint that entropy compresses normalised scores toward.
pub const ENTROPY_ATTRACTION: f64 = 0.5;

/// Half-width of the valence/arousal feature range.
const FEATURE_RANGE: f64 = 0.71;

/// Weighted sum of prominence and tactus-distance scores.
pub fn raw_score(tables: &RhythmTables, level: usize, accent: usize, tactus_level: usize) -> f64 {
    tables.weights.metrical_prominence * tables.prominence_score(level, accent)
        + tables.weights.tactus_distance * tables.tactus_distance_score(level.abs_diff(tactus_level))
}

/// `(score + density_term * impact) / max_score`, clamped at zero.
pub fn apply_density(score: f64, density_term: f64, impact: f64, max_score: f64) -> f64 {
    ((score + density_term * impact) / max_score).max(0.0)
}

/// Move every value toward `attraction` by `rate` (0 = unchanged, 1 = all
/// equal to `attraction`).
pub fn compress_values(attraction: f64, values: &[f64], rate: f64) -> Vec<f64> {
    values.iter().map(|v| v - (v - attraction) * rate).collect()
}

/// Map a feature in `[-0.71, 0.71]` onto `[0, max]`.
pub fn map_va_feature(value: f64, max: f64) -> f64 {
    (value + FEATURE_RANGE) / (2.0 * FEATURE_RANGE) * max
}
