//! Named note values and their durations in quarter notes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named note value, used to pick the tactus of a metre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationLabel {
    #[serde(rename = "dottedwholenote")]
    DottedWhole,
    #[serde(rename = "wholenote")]
    Whole,
    #[serde(rename = "dottedhalfnote")]
    DottedHalf,
    #[serde(rename = "halfnote")]
    Half,
    #[serde(rename = "dottedquarternote")]
    DottedQuarter,
    #[serde(rename = "quarternote")]
    Quarter,
    #[serde(rename = "dottedeighthnote")]
    DottedEighth,
    #[serde(rename = "eighthnote")]
    Eighth,
    #[serde(rename = "dottedsixteenthnote")]
    DottedSixteenth,
    #[serde(rename = "sixteenthnote")]
    Sixteenth,
    #[serde(rename = "thirtysecondnote")]
    ThirtySecond,
}

impl DurationLabel {
    pub const ALL: [DurationLabel; 11] = [
        DurationLabel::DottedWhole,
        DurationLabel::Whole,
        DurationLabel::DottedHalf,
        DurationLabel::Half,
        DurationLabel::DottedQuarter,
        DurationLabel::Quarter,
        DurationLabel::DottedEighth,
        DurationLabel::Eighth,
        DurationLabel::DottedSixteenth,
        DurationLabel::Sixteenth,
        DurationLabel::ThirtySecond,
    ];

    /// Duration in quarter notes.
    pub fn duration(self) -> f64 {
        match self {
            DurationLabel::DottedWhole => 6.0,
            DurationLabel::Whole => 4.0,
            DurationLabel::DottedHalf => 3.0,
            DurationLabel::Half => 2.0,
            DurationLabel::DottedQuarter => 1.5,
            DurationLabel::Quarter => 1.0,
            DurationLabel::DottedEighth => 0.75,
            DurationLabel::Eighth => 0.5,
            DurationLabel::DottedSixteenth => 0.375,
            DurationLabel::Sixteenth => 0.25,
            DurationLabel::ThirtySecond => 0.125,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DurationLabel::DottedWhole => "dottedwholenote",
            DurationLabel::Whole => "wholenote",
            DurationLabel::DottedHalf => "dottedhalfnote",
            DurationLabel::Half => "halfnote",
            DurationLabel::DottedQuarter => "dottedquarternote",
            DurationLabel::Quarter => "quarternote",
            DurationLabel::DottedEighth => "dottedeighthnote",
            DurationLabel::Eighth => "eighthnote",
            DurationLabel::DottedSixteenth => "dottedsixteenthnote",
            DurationLabel::Sixteenth => "sixteenthnote",
            DurationLabel::ThirtySecond => "thirtysecondnote",
        }
    }

    /// The label whose duration matches `duration` after rounding.
    pub fn from_duration(duration: f64) -> Option<Self> {
        let rounded = super::round_duration(duration);
        Self::ALL
            .into_iter()
            .find(|label| super::round_duration(label.duration()) == rounded)
    }
}

impl fmt::Display for DurationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DurationLabel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownDurationLabel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(
            "quarternote".parse::<DurationLabel>().unwrap(),
            DurationLabel::Quarter
        );
        assert_eq!(
            "DottedHalfNote".parse::<DurationLabel>().unwrap(),
            DurationLabel::DottedHalf
        );
        assert!("crotchet".parse::<DurationLabel>().is_err());
    }

    #[test]
    fn names_round_trip_through_display() {
        for label in DurationLabel::ALL {
            assert_eq!(label.to_string().parse::<DurationLabel>().unwrap(), label);
        }
    }

    #[test]
    fn lookup_by_duration() {
        assert_eq!(DurationLabel::from_duration(3.0), Some(DurationLabel::DottedHalf));
        assert_eq!(DurationLabel::from_duration(0.5), Some(DurationLabel::Eighth));
        assert_eq!(DurationLabel::from_duration(0.3), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let yaml = serde_yaml::to_string(&DurationLabel::Half).unwrap();
        assert_eq!(yaml.trim(), "halfnote");
        let parsed: DurationLabel = serde_yaml::from_str("eighthnote").unwrap();
        assert_eq!(parsed, DurationLabel::Eighth);
    }
}
