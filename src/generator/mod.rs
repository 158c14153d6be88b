//! Rhythm generator — fills bars by walking a metrical tree.
//!
//! Each step lists the nodes that can start the next note (see
//! [`RhythmTree::duration_candidates`]), scores them, draws one, and decides
//! whether the note is tied or dotted. The walk stops once the emitted
//! durations reach the span being filled.
//!
//! The generator only holds configuration. Every call builds a private tree
//! and draws from the caller's random stream, so one generator can serve any
//! number of threads.

pub mod element;
pub mod scoring;

pub use element::{dotted_factor, Extension, MusicalUnit, RhythmBar, RhythmElement};

use std::fmt;
use std::str::FromStr;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AdditionalMaterial, RhythmTables, TablesConfig};
use crate::error::{ConfigError, Result};
use crate::metre::{durations_equal, round_duration, Metre};
use crate::probability;
use crate::tree::{ChildIndex, NodeId, RhythmTree, RhythmTreeFactory};

/// Which musical line the rhythm is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Note rhythm, centred on the tactus.
    Melody,
    /// Chord-change rhythm, centred on the harmonic tactus.
    Harmony,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Melody => f.write_str("melody"),
            Role::Harmony => f.write_str("harmony"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "melody" => Ok(Role::Melody),
            "harmony" => Ok(Role::Harmony),
            other => Err(format!("unknown role '{other}' (expected melody or harmony)")),
        }
    }
}

/// Where a pickup or prolongation span sits in its bar.
#[derive(Debug, Clone, Copy)]
enum SpanEdge {
    End,
    Start,
}

/// Per-span walk state.
struct Fill {
    cursor: Option<NodeId>,
    pending_dots: u8,
    accumulated: f64,
    elements: Vec<RhythmElement>,
}

impl Fill {
    fn new() -> Self {
        Self {
            cursor: None,
            pending_dots: 0,
            accumulated: 0.0,
            elements: Vec::new(),
        }
    }
}

/// Stochastic bar filler for one role in one metre.
#[derive(Debug, Clone)]
pub struct RhythmGenerator {
    factory: RhythmTreeFactory,
    role: Role,
    tables: RhythmTables,
    density_impact: f64,
    entropy_impact: f64,
}

impl RhythmGenerator {
    /// Create a generator, validating `tables` against `metre`.
    pub fn new(metre: Metre, role: Role, tables: RhythmTables) -> Result<Self> {
        tables.validate(&metre)?;
        Ok(Self {
            factory: RhythmTreeFactory::new(metre),
            role,
            tables,
            density_impact: 0.0,
            entropy_impact: 0.0,
        })
    }

    /// Create a generator with built-in (or derived) tables.
    pub fn with_defaults(metre: Metre, role: Role) -> Result<Self> {
        let tables = TablesConfig::default().tables_for(role, &metre);
        Self::new(metre, role, tables)
    }

    pub fn metre(&self) -> &Metre {
        self.factory.metre()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tables(&self) -> &RhythmTables {
        &self.tables
    }

    pub fn density_impact(&self) -> f64 {
        self.density_impact
    }

    pub fn entropy_impact(&self) -> f64 {
        self.entropy_impact
    }

    /// Set the density impact, clamped to `[0, 1]`.
    pub fn set_density_impact(&mut self, impact: f64) {
        self.density_impact = impact.clamp(0.0, 1.0);
    }

    /// Set the entropy impact, clamped to `[0, 1]`.
    pub fn set_entropy_impact(&mut self, impact: f64) {
        self.entropy_impact = impact.clamp(0.0, 1.0);
    }

    /// Set density from a valence/arousal style feature in `[-0.71, 0.71]`.
    pub fn set_density_feature(&mut self, feature: f64) {
        self.set_density_impact(scoring::map_va_feature(feature, self.tables.max_impact.density));
    }

    /// Set entropy from a valence/arousal style feature in `[-0.71, 0.71]`.
    pub fn set_entropy_feature(&mut self, feature: f64) {
        self.set_entropy_impact(scoring::map_va_feature(feature, self.tables.max_impact.entropy));
    }

    /// Level the role's scores are centred on.
    pub fn tactus_level(&self) -> usize {
        match self.role {
            Role::Melody => self.metre().tactus_level(),
            Role::Harmony => self.metre().harmonic_tactus_level(),
        }
    }

    /// Build a fresh bar tree, with tuplets when the tables allow them.
    pub fn materialize_tree<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RhythmTree> {
        let mut tree = self.factory.build(self.tables.lowest_level)?;
        if self.tables.has_tuplets() {
            self.factory.add_tuplets(&mut tree, &self.tables, rng)?;
        }
        Ok(tree)
    }

    /// Generate one bar.
    pub fn generate_bar<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RhythmBar> {
        let tree = self.materialize_tree(rng)?;
        self.generate_bar_in(&tree, rng)
    }

    /// Fill the whole of `tree` with one bar.
    pub fn generate_bar_in<R: Rng + ?Sized>(&self, tree: &RhythmTree, rng: &mut R) -> Result<RhythmBar> {
        let elements = self.fill_span(tree, tree.root(), rng)?;
        debug!(
            "{} bar in {}: {} notes",
            self.role,
            self.metre().time_signature(),
            elements.len()
        );
        Ok(RhythmBar::new(elements))
    }

    pub fn generate_bars<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<RhythmBar>> {
        (0..count).map(|_| self.generate_bar(rng)).collect()
    }

    /// Generate `num_bars` bars with optional repetition, pickup and
    /// prolongation.
    pub fn generate_unit<R: Rng + ?Sized>(&self, num_bars: usize, rng: &mut R) -> Result<MusicalUnit> {
        let repeated = num_bars > 1 && probability::bernoulli(rng, self.tables.probability_repeat_bar);
        let bars = if repeated {
            let bar = self.generate_bar(rng)?;
            vec![bar; num_bars]
        } else {
            self.generate_bars(num_bars, rng)?
        };

        let pickup = match &self.tables.pickup {
            Some(material) => self.additional_span(material, SpanEdge::End, rng)?,
            None => None,
        };
        let prolongation = match &self.tables.prolongation {
            Some(material) => self.additional_span(material, SpanEdge::Start, rng)?,
            None => None,
        };

        Ok(MusicalUnit {
            pickup,
            bars,
            prolongation,
            repeated,
        })
    }

    /// Draw whether `material` appears and, if so, fill its span.
    fn additional_span<R: Rng + ?Sized>(
        &self,
        material: &AdditionalMaterial,
        edge: SpanEdge,
        rng: &mut R,
    ) -> Result<Option<Vec<RhythmElement>>> {
        if !probability::bernoulli(rng, material.probability) {
            return Ok(None);
        }
        let level = 1 + probability::decide_outcome(rng, &material.level_weights)?;
        let tree = self.factory.build(self.tables.lowest_level)?;
        let index = match edge {
            SpanEdge::End => ChildIndex::Last,
            SpanEdge::Start => ChildIndex::First,
        };
        let span = tree
            .descendant_at_index(tree.root(), level, index)
            .ok_or(ConfigError::TreeTooDeep {
                requested: level,
                available: tree.lowest_level(),
            })?;
        let elements = self.fill_span(&tree, span, rng)?;
        debug!("{edge:?} span at level {level}: {} notes", elements.len());
        Ok(Some(elements))
    }

    /// Walk the subtree at `span` until its duration is covered.
    fn fill_span<R: Rng + ?Sized>(&self, tree: &RhythmTree, span: NodeId, rng: &mut R) -> Result<Vec<RhythmElement>> {
        let target = tree.duration(span);
        let mut fill = Fill::new();

        while !durations_equal(fill.accumulated, target) {
            let candidates = match fill.cursor {
                None => Some(tree.leftmost_spine(span)),
                Some(cursor) => tree.duration_candidates(cursor, fill.pending_dots),
            };
            let candidates = match candidates {
                Some(c) if !c.is_empty() && round_duration(fill.accumulated) < round_duration(target) => c,
                _ => {
                    return Err(ConfigError::ExhaustedTree {
                        accumulated: round_duration(fill.accumulated),
                        target,
                    })
                }
            };

            let scores = self.candidate_scores(tree, &candidates);
            let node = candidates[probability::decide_outcome(rng, &scores)?];
            let extension = self.decide_extension(tree, node, span, rng);

            let duration = tree.duration(node) * dotted_factor(extension.dots());
            fill.elements.push(RhythmElement {
                duration,
                extension,
                level: tree.duration_level(node),
                accent: tree.metrical_accent(node),
            });
            fill.accumulated += duration;
            fill.cursor = Some(node);
            fill.pending_dots = extension.dots();
        }
        Ok(fill.elements)
    }

    /// Selection weights for `candidates`, after density and entropy.
    pub fn candidate_scores(&self, tree: &RhythmTree, candidates: &[NodeId]) -> Vec<f64> {
        let tactus = self.tactus_level();
        let max_score = self.tables.max_score();
        let scores: Vec<f64> = candidates
            .iter()
            .map(|&id| {
                let level = tree.duration_level(id);
                let raw = scoring::raw_score(&self.tables, level, tree.metrical_accent(id), tactus);
                scoring::apply_density(raw, self.tables.density_term(level), self.density_impact, max_score)
            })
            .collect();
        scoring::compress_values(scoring::ENTROPY_ATTRACTION, &scores, self.entropy_impact)
    }

    /// Tie, dot or nothing for a note starting on `node`.
    ///
    /// Nodes that close their parent (and the span itself) can only be tied.
    /// Others may borrow one or two dots from the right sibling, provided
    /// the sibling divides in halves far enough down and holds no tuplet.
    fn decide_extension<R: Rng + ?Sized>(&self, tree: &RhythmTree, node: NodeId, span: NodeId, rng: &mut R) -> Extension {
        let level = tree.duration_level(node);
        if node == span || tree.is_last_child(node) {
            return if probability::bernoulli(rng, self.tables.tie_probability(level)) {
                Extension::Tie
            } else {
                Extension::None
            };
        }

        if !probability::bernoulli(rng, self.tables.dot_probability(level)) {
            return Extension::None;
        }
        let Some(sibling) = tree.right_sibling(node) else {
            return Extension::None;
        };
        if tree.has_tuplet_descendants(sibling) {
            return Extension::None;
        }

        let mut dots = if probability::bernoulli(rng, self.tables.single_dot_probability(level)) {
            1
        } else {
            2
        };
        if dots == 2 && (tree.levels_below(node) < 2 || !halves_below(tree, sibling, 2)) {
            dots = 1;
        }
        if !halves_below(tree, sibling, dots as usize) {
            return Extension::None;
        }
        Extension::Dots(dots)
    }
}

/// Whether `depth` levels below `id`, following last children, every node
/// splits in two.
fn halves_below(tree: &RhythmTree, id: NodeId, depth: usize) -> bool {
    let mut current = id;
    for _ in 0..depth {
        if tree.children(current).len() != 2 {
            return false;
        }
        match tree.child_at(current, ChildIndex::Last) {
            Some(last) => current = last,
            None => return false,
        }
    }
    true
}
