//! Rhythm tables — the score and probability data that drive one role in one
//! metre.
//!
//! Row-indexed tables have one entry per duration level from 0 (the bar) to
//! `lowest_level`. The prominence table is indexed `[level][accent]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::metre::Metre;
use crate::probability;
use crate::tree::TupletType;

/// Relative weight of the two candidate scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub tactus_distance: f64,
    pub metrical_prominence: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            tactus_distance: 1.0,
            metrical_prominence: 1.0,
        }
    }
}

/// Upper bounds for the density and entropy impacts reached by a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub density: f64,
    pub entropy: f64,
}

impl Default for FeatureImpact {
    fn default() -> Self {
        Self {
            density: 1.0,
            entropy: 1.0,
        }
    }
}

/// Pickup or prolongation material: how often it appears and at which level.
///
/// `level_weights[i]` is the weight of a span at duration level `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalMaterial {
    pub probability: f64,
    pub level_weights: Vec<f64>,
}

/// Complete table set for one role in one metre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmTables {
    /// Deepest duration level the generator may emit.
    pub lowest_level: usize,
    /// Score by distance (in levels) from the tactus; clamps at the last entry.
    pub tactus_distance_scores: Vec<f64>,
    pub metrical_prominence_scores: Vec<Vec<f64>>,
    #[serde(default)]
    pub weights: ScoreWeights,
    pub density_impact: Vec<f64>,
    #[serde(default)]
    pub max_impact: FeatureImpact,
    pub probability_tie: Vec<f64>,
    pub probability_dot: Vec<f64>,
    /// Chance that a dot is single rather than double.
    pub probability_single_dot: Vec<f64>,
    /// Indexed `[level][accent]`; missing entries mean no tuplet.
    #[serde(default)]
    pub probability_tuplet: Vec<Vec<f64>>,
    /// Per level: weights of triplet, quintuplet, septuplet.
    #[serde(default)]
    pub tuplet_type_weights: Vec<Vec<f64>>,
    #[serde(default)]
    pub probability_repeat_bar: f64,
    #[serde(default)]
    pub pickup: Option<AdditionalMaterial>,
    #[serde(default)]
    pub prolongation: Option<AdditionalMaterial>,
}

impl RhythmTables {
    /// Score for a candidate `distance` levels away from the tactus.
    pub fn tactus_distance_score(&self, distance: usize) -> f64 {
        self.tactus_distance_scores
            .get(distance)
            .or(self.tactus_distance_scores.last())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn prominence_score(&self, level: usize, accent: usize) -> f64 {
        self.metrical_prominence_scores
            .get(level)
            .and_then(|row| row.get(accent))
            .copied()
            .unwrap_or(0.0)
    }

    /// Density modifier for `level` at full impact.
    pub fn density_term(&self, level: usize) -> f64 {
        row_value(&self.density_impact, level)
    }

    pub fn tie_probability(&self, level: usize) -> f64 {
        row_value(&self.probability_tie, level)
    }

    pub fn dot_probability(&self, level: usize) -> f64 {
        row_value(&self.probability_dot, level)
    }

    pub fn single_dot_probability(&self, level: usize) -> f64 {
        row_value(&self.probability_single_dot, level)
    }

    pub fn tuplet_probability(&self, level: usize, accent: usize) -> f64 {
        self.probability_tuplet
            .get(level)
            .and_then(|row| row.get(accent))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether any node can receive a tuplet.
    pub fn has_tuplets(&self) -> bool {
        self.probability_tuplet
            .iter()
            .flatten()
            .any(|&p| p > 0.0)
    }

    /// Draw a tuplet type for a node at `level`.
    ///
    /// A level without a weight row always yields a triplet.
    pub fn decide_tuplet_type<R: Rng + ?Sized>(&self, level: usize, rng: &mut R) -> Result<TupletType> {
        let Some(row) = self.tuplet_type_weights.get(level) else {
            return Ok(TupletType::Triplet);
        };
        let weighted: Vec<(TupletType, f64)> = TupletType::ALL
            .into_iter()
            .zip(row.iter().copied())
            .collect();
        probability::decide_keyed(rng, &weighted)
    }

    /// Normaliser that brings a weighted score back into `[0, 1]`.
    pub fn max_score(&self) -> f64 {
        self.weights.tactus_distance + self.weights.metrical_prominence
    }

    /// Check every table against `metre` and against each other.
    pub fn validate(&self, metre: &Metre) -> Result<()> {
        if self.lowest_level > metre.lowest_level() {
            return Err(ConfigError::TreeTooDeep {
                requested: self.lowest_level,
                available: metre.lowest_level(),
            });
        }
        let levels = self.lowest_level + 1;

        if self.tactus_distance_scores.is_empty() {
            return Err(ConfigError::table("tactus_distance_scores", "empty"));
        }
        check_scores("tactus_distance_scores", &self.tactus_distance_scores)?;

        check_len("metrical_prominence_scores", self.metrical_prominence_scores.len(), levels)?;
        for row in &self.metrical_prominence_scores {
            check_len("metrical_prominence_scores", row.len(), levels)?;
            check_scores("metrical_prominence_scores", row)?;
        }

        check_len("density_impact", self.density_impact.len(), levels)?;
        if self.density_impact.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::table("density_impact", "values must be finite"));
        }

        for (name, row) in [
            ("probability_tie", &self.probability_tie),
            ("probability_dot", &self.probability_dot),
            ("probability_single_dot", &self.probability_single_dot),
        ] {
            check_len(name, row.len(), levels)?;
            check_probabilities(name, row)?;
        }
        if self.dot_probability(self.lowest_level) > 0.0 {
            return Err(ConfigError::table(
                "probability_dot",
                "the lowest level has nothing to borrow a dot from",
            ));
        }

        if self.probability_tuplet.len() > levels {
            return Err(ConfigError::table(
                "probability_tuplet",
                format!("{} rows for {levels} levels", self.probability_tuplet.len()),
            ));
        }
        for (level, row) in self.probability_tuplet.iter().enumerate() {
            check_probabilities("probability_tuplet", row)?;
            let fits = level + 2 <= self.lowest_level;
            if !fits && row.iter().any(|&p| p > 0.0) {
                return Err(ConfigError::table(
                    "probability_tuplet",
                    format!("level {level} has no room for a tuplet"),
                ));
            }
        }
        for (level, row) in self.tuplet_type_weights.iter().enumerate() {
            check_len("tuplet_type_weights", row.len(), TupletType::ALL.len())?;
            check_scores("tuplet_type_weights", row)?;
            let used = self
                .probability_tuplet
                .get(level)
                .is_some_and(|r| r.iter().any(|&p| p > 0.0));
            if used && row.iter().sum::<f64>() <= 0.0 {
                return Err(ConfigError::table(
                    "tuplet_type_weights",
                    format!("level {level} draws tuplets but has no type weight"),
                ));
            }
        }

        check_probabilities("probability_repeat_bar", &[self.probability_repeat_bar])?;

        let weights = [self.weights.tactus_distance, self.weights.metrical_prominence];
        check_scores("weights", &weights)?;
        if self.max_score() <= 0.0 {
            return Err(ConfigError::table("weights", "weights must not both be zero"));
        }
        check_probabilities("max_impact", &[self.max_impact.density, self.max_impact.entropy])?;

        for (name, material) in [("pickup", &self.pickup), ("prolongation", &self.prolongation)] {
            let Some(material) = material else {
                continue;
            };
            check_probabilities(name, &[material.probability])?;
            if material.level_weights.is_empty() || material.level_weights.len() > self.lowest_level {
                return Err(ConfigError::table(
                    name,
                    format!("expected 1..={} level weights", self.lowest_level),
                ));
            }
            check_scores(name, &material.level_weights)?;
            if material.level_weights.iter().sum::<f64>() <= 0.0 {
                return Err(ConfigError::table(name, "level weights sum to zero"));
            }
        }
        Ok(())
    }
}

fn row_value(row: &[f64], level: usize) -> f64 {
    row.get(level).copied().unwrap_or(0.0)
}

fn check_len(table: &'static str, got: usize, want: usize) -> Result<()> {
    if got != want {
        return Err(ConfigError::table(table, format!("expected {want} entries, found {got}")));
    }
    Ok(())
}

fn check_scores(table: &'static str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ConfigError::table(table, "scores must be finite and non-negative"));
    }
    Ok(())
}

fn check_probabilities(table: &'static str, values: &[f64]) -> Result<()> {
    if values.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(ConfigError::table(table, "probabilities must lie in [0, 1]"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn four_four() -> Metre {
        Metre::new("4/4", "quarternote", "halfnote").unwrap()
    }

    #[test]
    fn tactus_distance_clamps_to_last_entry() {
        let t = builtin::melody_four_four();
        assert_eq!(t.tactus_distance_score(0), 1.0);
        assert_eq!(t.tactus_distance_score(3), 0.2);
        assert_eq!(t.tactus_distance_score(9), 0.2);
    }

    #[test]
    fn lookups_outside_tables_are_zero() {
        let t = builtin::harmony_four_four();
        assert_eq!(t.prominence_score(7, 0), 0.0);
        assert_eq!(t.tuplet_probability(1, 1), 0.0);
        assert_eq!(t.dot_probability(12), 0.0);
        assert!(!t.has_tuplets());
    }

    #[test]
    fn dot_at_lowest_level_is_rejected() {
        let mut t = builtin::melody_four_four();
        t.probability_dot[4] = 0.1;
        let err = t.validate(&four_four()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTable { table: "probability_dot", .. }));
    }

    #[test]
    fn short_rows_are_rejected() {
        let mut t = builtin::melody_four_four();
        t.probability_tie.pop();
        assert!(t.validate(&four_four()).is_err());

        let mut t = builtin::melody_four_four();
        t.metrical_prominence_scores[2].push(0.0);
        assert!(t.validate(&four_four()).is_err());
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let mut t = builtin::harmony_four_four();
        t.probability_repeat_bar = 3.0;
        assert!(matches!(
            t.validate(&four_four()),
            Err(ConfigError::InvalidTable { table: "probability_repeat_bar", .. })
        ));
    }

    #[test]
    fn tuplet_without_room_is_rejected() {
        let mut t = builtin::melody_four_four();
        t.probability_tuplet.push(vec![0.0, 0.0, 0.0, 0.5]);
        assert!(matches!(
            t.validate(&four_four()),
            Err(ConfigError::InvalidTable { table: "probability_tuplet", .. })
        ));
    }

    #[test]
    fn tables_deeper_than_metre_are_rejected() {
        let mut t = builtin::melody_four_four();
        t.lowest_level = 9;
        assert!(matches!(
            t.validate(&four_four()),
            Err(ConfigError::TreeTooDeep { requested: 9, .. })
        ));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut t = builtin::melody_four_four();
        t.weights = ScoreWeights {
            tactus_distance: 0.0,
            metrical_prominence: 0.0,
        };
        assert!(t.validate(&four_four()).is_err());
    }

    #[test]
    fn tuplet_type_follows_weights() {
        let mut t = builtin::melody_four_four();
        t.tuplet_type_weights[2] = vec![0.0, 0.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            assert_eq!(t.decide_tuplet_type(2, &mut rng).unwrap(), TupletType::Septuplet);
        }
        assert_eq!(t.decide_tuplet_type(7, &mut rng).unwrap(), TupletType::Triplet);
    }

    #[test]
    fn yaml_round_trip_keeps_optional_sections() {
        let t = builtin::melody_three_four();
        let yaml = serde_yaml::to_string(&t).unwrap();
        let back: RhythmTables = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn optional_fields_default() {
        let yaml = r#"
lowest_level: 1
tactus_distance_scores: [1.0, 0.5]
metrical_prominence_scores: [[1.0, 0.0], [0.5, 1.0]]
density_impact: [0.0, 1.0]
probability_tie: [0.2, 0.2]
probability_dot: [0.0, 0.0]
probability_single_dot: [0.0, 0.0]
"#;
        let t: RhythmTables = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.weights, ScoreWeights::default());
        assert!(t.pickup.is_none());
        assert!(t.probability_tuplet.is_empty());
        t.validate(&four_four()).unwrap();
    }
}
