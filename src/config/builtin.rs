//! Built-in tables — tuned score and probability tables for 4/4 and 3/4,
//! plus a formula that derives tables for any other supported metre.

use crate::generator::Role;
use crate::metre::Metre;

use super::{AdditionalMaterial, FeatureImpact, RhythmTables, ScoreWeights};

/// Tables shipped for `time_signature`, if any.
pub fn tables(role: Role, time_signature: &str) -> Option<RhythmTables> {
    match (role, time_signature) {
        (Role::Melody, "4/4") => Some(melody_four_four()),
        (Role::Melody, "3/4") => Some(melody_three_four()),
        (Role::Harmony, "4/4") => Some(harmony_four_four()),
        (Role::Harmony, "3/4") => Some(harmony_three_four()),
        _ => None,
    }
}

/// Melody in 4/4: down to sixteenths, tuplets at half and quarter level.
pub fn melody_four_four() -> RhythmTables {
    RhythmTables {
        lowest_level: 4,
        tactus_distance_scores: vec![1.0, 0.6, 0.4, 0.2],
        metrical_prominence_scores: vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.7, 1.0, 0.0, 0.0, 0.0],
            vec![0.3, 0.5, 1.0, 0.0, 0.0],
            vec![0.1, 0.3, 0.5, 1.0, 0.0],
            vec![0.05, 0.2, 0.2, 0.5, 1.0],
        ],
        weights: ScoreWeights::default(),
        density_impact: vec![-0.5, -0.2, 0.0, 0.6, 1.0],
        max_impact: FeatureImpact::default(),
        probability_tie: vec![0.1, 0.4, 0.6, 0.7, 0.7],
        probability_dot: vec![0.0, 0.2, 0.2, 0.1, 0.0],
        probability_single_dot: vec![0.0, 0.8, 0.8, 1.0, 0.0],
        probability_tuplet: vec![
            vec![0.0],
            vec![0.03, 0.02],
            vec![0.05, 0.04, 0.04],
        ],
        tuplet_type_weights: vec![
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![7.0, 2.0, 1.0],
        ],
        probability_repeat_bar: 0.0,
        pickup: Some(AdditionalMaterial {
            probability: 0.25,
            level_weights: vec![0.1, 0.5, 0.4],
        }),
        prolongation: Some(AdditionalMaterial {
            probability: 0.15,
            level_weights: vec![0.3, 0.5, 0.2],
        }),
    }
}

/// Melody in 3/4: down to sixteenths, triplets on the beat.
pub fn melody_three_four() -> RhythmTables {
    RhythmTables {
        lowest_level: 3,
        tactus_distance_scores: vec![1.0, 0.6, 0.5],
        metrical_prominence_scores: vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.7, 1.0, 0.0, 0.0],
            vec![0.5, 0.7, 1.0, 0.0],
            vec![0.2, 0.3, 0.6, 1.0],
        ],
        weights: ScoreWeights::default(),
        density_impact: vec![0.0, 0.3, 0.6, 1.0],
        max_impact: FeatureImpact::default(),
        probability_tie: vec![0.3, 0.2, 0.2, 0.1],
        probability_dot: vec![0.0, 0.2, 0.2, 0.0],
        probability_single_dot: vec![0.0, 0.8, 1.0, 0.0],
        probability_tuplet: vec![vec![0.0], vec![0.04, 0.03]],
        tuplet_type_weights: vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]],
        probability_repeat_bar: 0.0,
        pickup: Some(AdditionalMaterial {
            probability: 0.25,
            level_weights: vec![0.6, 0.4],
        }),
        prolongation: Some(AdditionalMaterial {
            probability: 0.15,
            level_weights: vec![0.7, 0.3],
        }),
    }
}

/// Harmonic rhythm in 4/4: chord changes no faster than eighths.
pub fn harmony_four_four() -> RhythmTables {
    RhythmTables {
        lowest_level: 3,
        tactus_distance_scores: vec![1.0, 0.6, 0.4, 0.2],
        metrical_prominence_scores: vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.7, 1.0, 0.0, 0.0],
            vec![0.3, 0.5, 1.0, 0.0],
            vec![0.1, 0.3, 0.5, 1.0],
        ],
        weights: ScoreWeights::default(),
        density_impact: vec![-0.5, -0.2, 0.0, 1.0],
        max_impact: FeatureImpact::default(),
        probability_tie: vec![0.5, 0.02, 0.1, 0.9],
        probability_dot: vec![0.0, 0.5, 0.5, 0.0],
        probability_single_dot: vec![0.0, 0.0, 1.0, 0.0],
        probability_tuplet: Vec::new(),
        tuplet_type_weights: Vec::new(),
        probability_repeat_bar: 0.3,
        pickup: None,
        prolongation: None,
    }
}

/// Harmonic rhythm in 3/4: chord changes no faster than eighths.
pub fn harmony_three_four() -> RhythmTables {
    RhythmTables {
        lowest_level: 2,
        tactus_distance_scores: vec![1.0, 0.6, 0.5],
        metrical_prominence_scores: vec![
            vec![1.0, 0.0, 0.0],
            vec![0.7, 1.0, 0.0],
            vec![0.5, 0.7, 1.0],
        ],
        weights: ScoreWeights::default(),
        density_impact: vec![0.0, 0.4, 1.0],
        max_impact: FeatureImpact::default(),
        probability_tie: vec![0.3, 0.2, 0.9],
        probability_dot: vec![0.0, 0.1, 0.0],
        probability_single_dot: vec![0.0, 1.0, 0.0],
        probability_tuplet: Vec::new(),
        tuplet_type_weights: Vec::new(),
        probability_repeat_bar: 0.2,
        pickup: None,
        prolongation: None,
    }
}

/// Tables for metres without tuned data.
///
/// Prominence peaks where accent equals level and decays by 0.3 per level of
/// accent strength; density rises linearly with depth; dots are allowed
/// everywhere except the bar and the lowest level.
pub fn derived(role: Role, metre: &Metre) -> RhythmTables {
    let depth_cap = match role {
        Role::Melody => 4,
        Role::Harmony => 3,
    };
    let lowest = metre.lowest_level().min(depth_cap);
    let levels = lowest + 1;

    let tactus_distance_scores: Vec<f64> = (0..levels)
        .map(|d| match d {
            0 => 1.0,
            1 => 0.6,
            2 => 0.4,
            _ => 0.2,
        })
        .collect();

    let metrical_prominence_scores: Vec<Vec<f64>> = (0..levels)
        .map(|level| {
            (0..levels)
                .map(|accent| {
                    if accent > level {
                        0.0
                    } else {
                        (1.0 - 0.3 * (level - accent) as f64).max(0.05)
                    }
                })
                .collect()
        })
        .collect();

    let density_impact: Vec<f64> = (0..levels)
        .map(|level| {
            if lowest == 0 {
                0.0
            } else {
                -0.5 + 1.5 * level as f64 / lowest as f64
            }
        })
        .collect();

    let inner = |value: f64| -> Vec<f64> {
        (0..levels)
            .map(|level| if level == 0 || level == lowest { 0.0 } else { value })
            .collect()
    };

    RhythmTables {
        lowest_level: lowest,
        tactus_distance_scores,
        metrical_prominence_scores,
        weights: ScoreWeights::default(),
        density_impact,
        max_impact: FeatureImpact::default(),
        probability_tie: vec![0.3; levels],
        probability_dot: inner(0.15),
        probability_single_dot: inner(0.8),
        probability_tuplet: Vec::new(),
        tuplet_type_weights: Vec::new(),
        probability_repeat_bar: match role {
            Role::Melody => 0.0,
            Role::Harmony => 0.2,
        },
        pickup: None,
        prolongation: None,
    }
}
