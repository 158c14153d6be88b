//! Metre — time signature, bar duration and the duration-level hierarchy.
//!
//! Durations are measured in quarter notes. Level 0 is the whole bar; each
//! level below it divides the previous one by that level's subdivision
//! factor, down to the thirty-second note. Duration arithmetic is done in
//! `f64` and compared after [`round_duration`], which keeps tuplet sums
//! (thirds, fifths, sevenths) exact enough to close a bar.

pub mod label;

pub use label::DurationLabel;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Decimal places kept when comparing durations.
pub const DURATION_DECIMALS: i32 = 6;

/// No level is generated below this duration (a thirty-second note).
pub const SHORTEST_DURATION: f64 = 0.125;

/// Round a duration to [`DURATION_DECIMALS`] places.
pub fn round_duration(duration: f64) -> f64 {
    let scale = 10f64.powi(DURATION_DECIMALS);
    (duration * scale).round() / scale
}

/// Whether two durations are equal at [`DURATION_DECIMALS`] precision.
pub fn durations_equal(a: f64, b: f64) -> bool {
    round_duration(a) == round_duration(b)
}

/// A time signature such as `4/4` or `3/4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl TimeSignature {
    /// Bar duration in quarter notes.
    pub fn bar_duration(self) -> f64 {
        self.beats_per_bar as f64 * 4.0 / self.beat_unit as f64
    }

    /// Leading subdivision factors that are not 2.
    ///
    /// Even (or single-beat) bars divide by 2 everywhere. Bars divisible by 3
    /// divide by 3 at the top and recurse on the remaining beats. Everything
    /// else is unsupported.
    fn leading_factors(beats: u32) -> Option<Vec<u32>> {
        if beats % 2 == 0 || beats <= 1 {
            Some(Vec::new())
        } else if beats % 3 == 0 {
            let mut factors = vec![3];
            factors.extend(Self::leading_factors(beats / 3)?);
            Some(factors)
        } else {
            None
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.beat_unit)
    }
}

impl FromStr for TimeSignature {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || ConfigError::UnsupportedTimeSignature(s.to_string());
        let (beats, unit) = s.trim().split_once('/').ok_or_else(unsupported)?;
        let beats_per_bar: u32 = beats.trim().parse().map_err(|_| unsupported())?;
        let beat_unit: u32 = unit.trim().parse().map_err(|_| unsupported())?;

        if beats_per_bar == 0 || !beat_unit.is_power_of_two() || beat_unit > 32 {
            return Err(unsupported());
        }
        if Self::leading_factors(beats_per_bar).is_none() {
            return Err(unsupported());
        }
        Ok(Self {
            beats_per_bar,
            beat_unit,
        })
    }
}

/// A preferred beat: its duration level and note-value label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tactus {
    pub level: usize,
    pub label: DurationLabel,
}

/// Immutable description of a time signature's duration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Metre {
    time_signature: TimeSignature,
    /// Duration of each level, index 0 = bar.
    durations: Vec<f64>,
    /// `subdivisions[l]` children per node at level `l`; one fewer than `durations`.
    subdivisions: Vec<u32>,
    tactus: Tactus,
    harmonic_tactus: Tactus,
}

impl Metre {
    /// Build a metre from a time signature string and two tactus labels.
    pub fn new(time_signature: &str, tactus: &str, harmonic_tactus: &str) -> Result<Self> {
        Self::from_parts(
            time_signature.parse()?,
            tactus.parse()?,
            harmonic_tactus.parse()?,
        )
    }

    /// Build a metre with the beat unit as tactus and the first level below
    /// the bar as harmonic tactus.
    ///
    /// Levels without a note-value label (2.25 quarter notes in 27/16) are
    /// skipped in favour of the next labelled level down.
    pub fn with_default_tactus(time_signature: &str) -> Result<Self> {
        let ts: TimeSignature = time_signature.parse()?;
        let (durations, _) = Self::levels(ts);
        let beat = 4.0 / ts.beat_unit as f64;
        let first_level = 1.min(durations.len() - 1);
        let labelled_from = |level: usize| {
            durations[level..]
                .iter()
                .find_map(|d| DurationLabel::from_duration(*d))
                .ok_or_else(|| ConfigError::MisalignedTactus {
                    label: format!("level {level}"),
                    duration: durations[level],
                    time_signature: ts.to_string(),
                })
        };

        let tactus = match DurationLabel::from_duration(beat) {
            Some(label) if durations.iter().any(|d| durations_equal(*d, beat)) => label,
            _ => labelled_from(first_level)?,
        };
        Self::from_parts(ts, tactus, labelled_from(first_level)?)
    }

    pub fn from_parts(
        time_signature: TimeSignature,
        tactus: DurationLabel,
        harmonic_tactus: DurationLabel,
    ) -> Result<Self> {
        let (durations, subdivisions) = Self::levels(time_signature);

        let locate = |label: DurationLabel| {
            durations
                .iter()
                .position(|d| durations_equal(*d, label.duration()))
                .map(|level| Tactus { level, label })
                .ok_or_else(|| ConfigError::MisalignedTactus {
                    label: label.to_string(),
                    duration: label.duration(),
                    time_signature: time_signature.to_string(),
                })
        };

        Ok(Self {
            time_signature,
            tactus: locate(tactus)?,
            harmonic_tactus: locate(harmonic_tactus)?,
            durations,
            subdivisions,
        })
    }

    fn levels(time_signature: TimeSignature) -> (Vec<f64>, Vec<u32>) {
        let leading = TimeSignature::leading_factors(time_signature.beats_per_bar)
            .unwrap_or_default();
        let mut durations = vec![time_signature.bar_duration()];
        let mut subdivisions = Vec::new();

        loop {
            let level = subdivisions.len();
            let factor = leading.get(level).copied().unwrap_or(2);
            let next = durations[level] / factor as f64;
            if round_duration(next) < SHORTEST_DURATION {
                break;
            }
            subdivisions.push(factor);
            durations.push(next);
        }
        (durations, subdivisions)
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn bar_duration(&self) -> f64 {
        self.durations[0]
    }

    /// Deepest level this metre describes.
    pub fn lowest_level(&self) -> usize {
        self.durations.len() - 1
    }

    /// Duration of a level, or `None` below the lowest level.
    pub fn duration_of_level(&self, level: usize) -> Option<f64> {
        self.durations.get(level).copied()
    }

    /// Level whose duration equals `duration`, if any.
    pub fn level_of_duration(&self, duration: f64) -> Option<usize> {
        self.durations
            .iter()
            .position(|d| durations_equal(*d, duration))
    }

    pub fn label_of_level(&self, level: usize) -> Option<DurationLabel> {
        self.duration_of_level(level)
            .and_then(DurationLabel::from_duration)
    }

    /// Number of children a node at `level` is divided into.
    pub fn subdivision(&self, level: usize) -> Option<u32> {
        self.subdivisions.get(level).copied()
    }

    pub fn subdivisions(&self) -> &[u32] {
        &self.subdivisions
    }

    pub fn tactus(&self) -> Tactus {
        self.tactus
    }

    pub fn tactus_level(&self) -> usize {
        self.tactus.level
    }

    pub fn harmonic_tactus(&self) -> Tactus {
        self.harmonic_tactus
    }

    pub fn harmonic_tactus_level(&self) -> usize {
        self.harmonic_tactus.level
    }
}
