//! Generation property tests — bar totals, sampling bias, determinism and
//! role-level units across metres.

use std::sync::Arc;
use std::thread;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rhythmspace::config::builtin;
use rhythmspace::generator::{Extension, RhythmGenerator, Role};
use rhythmspace::metre::{durations_equal, Metre};
use rhythmspace::ConfigError;

const SIGNATURES: [&str; 7] = ["4/4", "3/4", "2/4", "2/2", "6/8", "9/8", "12/8"];

fn generator(ts: &str, role: Role) -> RhythmGenerator {
    let metre = Metre::with_default_tactus(ts).unwrap();
    RhythmGenerator::with_defaults(metre, role).unwrap()
}

/// Melody 4/4 tables with tuplets switched off, so every root spine has the
/// same five levels.
fn plain_four_four() -> RhythmGenerator {
    let mut tables = builtin::melody_four_four();
    tables.probability_tuplet.clear();
    tables.tuplet_type_weights.clear();
    let metre = Metre::with_default_tactus("4/4").unwrap();
    RhythmGenerator::new(metre, Role::Melody, tables).unwrap()
}

fn first_level_counts(generator: &RhythmGenerator, bars: usize, seed: u64) -> [usize; 5] {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = [0usize; 5];
    for _ in 0..bars {
        let bar = generator.generate_bar(&mut rng).unwrap();
        counts[bar.elements[0].level] += 1;
    }
    counts
}

// =============================================================================
// Bar totals
// =============================================================================

#[test]
fn every_bar_fills_its_metre() {
    for ts in SIGNATURES {
        for role in [Role::Melody, Role::Harmony] {
            let generator = generator(ts, role);
            let bar_duration = generator.metre().bar_duration();
            for seed in 0..40 {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                for bar in generator.generate_bars(3, &mut rng).unwrap() {
                    assert!(
                        bar.fills(bar_duration),
                        "{role} {ts} seed {seed}: {bar} sums to {}",
                        bar.total_duration()
                    );
                }
            }
        }
    }
}

#[test]
fn bars_fill_under_extreme_settings() {
    for (density, entropy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
        let mut generator = generator("4/4", Role::Melody);
        generator.set_density_impact(density);
        generator.set_entropy_impact(entropy);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for bar in generator.generate_bars(100, &mut rng).unwrap() {
            assert!(bar.fills(4.0), "density {density} entropy {entropy}: {bar}");
        }
    }
}

#[test]
fn harmony_never_emits_tuplet_durations() {
    let generator = generator("4/4", Role::Harmony);
    let metre = generator.metre().clone();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for bar in generator.generate_bars(200, &mut rng).unwrap() {
        for element in bar.elements {
            let base = element.duration / rhythmspace::generator::dotted_factor(element.extension.dots());
            assert!(
                metre.level_of_duration(base).is_some(),
                "{} is not on the metrical grid",
                element.duration
            );
            assert!(element.level <= 3);
        }
    }
}

#[test]
fn dotted_notes_are_dotted_level_durations() {
    let generator = generator("4/4", Role::Melody);
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut seen = 0;
    for bar in generator.generate_bars(300, &mut rng).unwrap() {
        for element in bar.elements {
            if let Extension::Dots(n) = element.extension {
                assert!(n == 1 || n == 2);
                assert!(element.level > 0 && element.level < 4);
                seen += 1;
            }
        }
    }
    assert!(seen > 0, "no dotted notes in 300 bars");
}

// =============================================================================
// Scoring bias
// =============================================================================

#[test]
fn full_entropy_makes_the_first_choice_uniform() {
    let mut generator = plain_four_four();
    generator.set_entropy_impact(1.0);
    let counts = first_level_counts(&generator, 1000, 42);
    for count in counts {
        assert!((140..=260).contains(&count), "counts {counts:?}");
    }
}

#[test]
fn entropy_raises_the_chance_of_unlikely_levels() {
    let mut generator = plain_four_four();
    let low = first_level_counts(&generator, 1000, 1)[4];
    generator.set_entropy_impact(1.0);
    let high = first_level_counts(&generator, 1000, 1)[4];
    assert!(high > low, "sixteenths: {low} without entropy, {high} with");
}

#[test]
fn density_adds_notes() {
    let mut generator = plain_four_four();
    let notes = |generator: &RhythmGenerator| -> usize {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        generator
            .generate_bars(300, &mut rng)
            .unwrap()
            .iter()
            .map(|b| b.len())
            .sum()
    };
    let sparse = notes(&generator);
    generator.set_density_impact(1.0);
    let dense = notes(&generator);
    assert!(dense > sparse, "{sparse} notes at density 0, {dense} at density 1");
}

// =============================================================================
// Determinism and threads
// =============================================================================

#[test]
fn seeded_generation_is_reproducible() {
    let generator = generator("3/4", Role::Melody);
    let a = generator.generate_unit(4, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
    let b = generator.generate_unit(4, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn shared_generator_gives_per_thread_streams() {
    let generator = Arc::new(generator("4/4", Role::Melody));
    let expected: Vec<_> = (0..4u64)
        .map(|seed| {
            generator
                .generate_bars(5, &mut ChaCha8Rng::seed_from_u64(seed))
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                generator
                    .generate_bars(5, &mut ChaCha8Rng::seed_from_u64(seed))
                    .unwrap()
            })
        })
        .collect();

    for (handle, want) in handles.into_iter().zip(expected) {
        assert_eq!(handle.join().unwrap(), want);
    }
}

// =============================================================================
// Musical units
// =============================================================================

#[test]
fn repeat_bar_clones_one_bar() {
    let mut tables = builtin::harmony_four_four();
    tables.probability_repeat_bar = 1.0;
    let metre = Metre::with_default_tactus("4/4").unwrap();
    let generator = RhythmGenerator::new(metre, Role::Harmony, tables).unwrap();
    let unit = generator.generate_unit(4, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
    assert!(unit.repeated);
    assert_eq!(unit.bars.len(), 4);
    assert!(unit.bars.iter().all(|b| *b == unit.bars[0]));
}

#[test]
fn units_without_repetition_generate_each_bar() {
    let mut tables = builtin::harmony_four_four();
    tables.probability_repeat_bar = 0.0;
    let metre = Metre::with_default_tactus("4/4").unwrap();
    let generator = RhythmGenerator::new(metre, Role::Harmony, tables).unwrap();
    let unit = generator.generate_unit(6, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
    assert!(!unit.repeated);
    assert_eq!(unit.bars.len(), 6);
    assert!(unit.pickup.is_none());
    assert!(unit.prolongation.is_none());
}

#[test]
fn melody_units_sometimes_carry_pickups() {
    let generator = generator("4/4", Role::Melody);
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let mut pickups = 0;
    for _ in 0..100 {
        let unit = generator.generate_unit(2, &mut rng).unwrap();
        if let Some(pickup) = &unit.pickup {
            pickups += 1;
            let total: f64 = pickup.iter().map(|e| e.duration).sum();
            assert!([2.0, 1.0, 0.5].iter().any(|&d| durations_equal(total, d)));
        }
    }
    assert!(pickups > 0 && pickups < 100);
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn invalid_tables_are_rejected_at_construction() {
    let mut tables = builtin::melody_four_four();
    tables.probability_single_dot.truncate(2);
    let metre = Metre::with_default_tactus("4/4").unwrap();
    let err = RhythmGenerator::new(metre, Role::Melody, tables).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTable { .. }));
}

#[test]
fn tables_for_another_metre_are_rejected() {
    let metre = Metre::with_default_tactus("1/4").unwrap();
    let err = RhythmGenerator::new(metre, Role::Melody, builtin::melody_four_four()).unwrap_err();
    assert!(matches!(err, ConfigError::TreeTooDeep { requested: 4, available: 3 }));
}
