//! rhythmspace — metrical-tree rhythm generation for algorithmic composition.
//!
//! A [`metre::Metre`] describes how a bar divides into levels. The
//! [`tree::RhythmTreeFactory`] turns it into a [`tree::RhythmTree`], optionally
//! with tuplets, and the [`generator::RhythmGenerator`] walks that tree to
//! emit bars whose durations add up exactly to the bar.

pub mod config;
pub mod error;
pub mod generator;
pub mod metre;
pub mod probability;
pub mod tree;

pub use config::{RhythmTables, TablesConfig};
pub use error::{ConfigError, Result};
pub use generator::{Extension, MusicalUnit, RhythmBar, RhythmElement, RhythmGenerator, Role};
pub use metre::{DurationLabel, Metre, TimeSignature};
pub use tree::{RhythmTree, RhythmTreeFactory, TupletType};
