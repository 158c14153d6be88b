//! Generated rhythm values — elements, bars and musical units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metre::{durations_equal, round_duration, DurationLabel};

/// What follows a note beyond its own node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    None,
    /// Tied over into the next onset.
    Tie,
    /// One or two dots borrowed from the right sibling.
    Dots(u8),
}

impl Extension {
    pub fn dots(self) -> u8 {
        match self {
            Extension::Dots(n) => n,
            _ => 0,
        }
    }

    pub fn is_tie(self) -> bool {
        self == Extension::Tie
    }
}

/// Factor applied to a node's duration by `dots` dots: `Σ 2^-i, i = 0..=dots`.
pub fn dotted_factor(dots: u8) -> f64 {
    (0..=dots as i32).map(|i| 0.5f64.powi(i)).sum()
}

/// One emitted note slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmElement {
    /// Sounding duration in quarter notes, dots included.
    pub duration: f64,
    pub extension: Extension,
    /// Duration level of the node the note starts on.
    pub level: usize,
    pub accent: usize,
}

impl fmt::Display for RhythmElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DurationLabel::from_duration(self.duration) {
            Some(label) => write!(f, "{label}")?,
            None => write!(f, "{}", round_duration(self.duration))?,
        }
        if self.extension.is_tie() {
            f.write_str("~")?;
        }
        Ok(())
    }
}

/// Sum of element durations.
pub fn total_duration(elements: &[RhythmElement]) -> f64 {
    elements.iter().map(|e| e.duration).sum()
}

/// A bar's worth of elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RhythmBar {
    pub elements: Vec<RhythmElement>,
}

impl RhythmBar {
    pub fn new(elements: Vec<RhythmElement>) -> Self {
        Self { elements }
    }

    pub fn total_duration(&self) -> f64 {
        total_duration(&self.elements)
    }

    /// Whether the elements add up to `bar_duration` after rounding.
    pub fn fills(&self, bar_duration: f64) -> bool {
        durations_equal(self.total_duration(), bar_duration)
    }

    pub fn durations(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.duration).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl fmt::Display for RhythmBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

/// Bars plus optional material before the first and after the last bar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MusicalUnit {
    /// Upbeat filling the end of an empty bar before the unit.
    pub pickup: Option<Vec<RhythmElement>>,
    pub bars: Vec<RhythmBar>,
    /// Extra material at the start of a bar after the unit.
    pub prolongation: Option<Vec<RhythmElement>>,
    /// All bars are copies of one generated bar.
    pub repeated: bool,
}

impl fmt::Display for MusicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = |elements: &[RhythmElement]| {
            RhythmBar::new(elements.to_vec()).to_string()
        };
        if let Some(pickup) = &self.pickup {
            write!(f, "({}) ", span(pickup))?;
        }
        let bars: Vec<String> = self.bars.iter().map(|b| b.to_string()).collect();
        write!(f, "| {} |", bars.join(" | "))?;
        if let Some(prolongation) = &self.prolongation {
            write!(f, " ({})", span(prolongation))?;
        }
        Ok(())
    }
}
