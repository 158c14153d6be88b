//! Rhythm tree factory — builds trees from a metre and performs tuplet surgery.
//!
//! Ordinary subdivision follows the metre's per-level factors. Tuplets replace
//! a node's children with an odd number of equal parts, each re-expanded by
//! halving down to the tree's lowest level. Restoring a tuplet node rebuilds
//! its ordinary subtree, so insert-then-restore yields a tree identical to a
//! freshly built one.

use std::fmt;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RhythmTables;
use crate::error::{ConfigError, Result};
use crate::metre::Metre;
use crate::probability;

use super::{NodeId, RhythmTree};

/// Odd equal subdivisions that can replace a node's ordinary children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TupletType {
    Triplet,
    Quintuplet,
    Septuplet,
}

impl TupletType {
    /// Order used by tuplet-type weight tables.
    pub const ALL: [TupletType; 3] = [
        TupletType::Triplet,
        TupletType::Quintuplet,
        TupletType::Septuplet,
    ];

    pub fn divisions(self) -> u32 {
        match self {
            TupletType::Triplet => 3,
            TupletType::Quintuplet => 5,
            TupletType::Septuplet => 7,
        }
    }

    pub fn from_divisions(divisions: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.divisions() == divisions)
    }

    /// Levels between the tuplet node and its items.
    ///
    /// Triplet items replace one ordinary level; five or seven items are
    /// closer to the level after that.
    pub fn level_offset(self) -> usize {
        match self {
            TupletType::Triplet => 1,
            TupletType::Quintuplet | TupletType::Septuplet => 2,
        }
    }
}

impl fmt::Display for TupletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-tuplet", self.divisions())
    }
}

/// Ordinary levels that must exist below a node before it can take a tuplet.
const TUPLET_ROOM: usize = 2;

/// Builds rhythm trees for one metre.
#[derive(Debug, Clone)]
pub struct RhythmTreeFactory {
    metre: Metre,
}

impl RhythmTreeFactory {
    pub fn new(metre: Metre) -> Self {
        Self { metre }
    }

    pub fn metre(&self) -> &Metre {
        &self.metre
    }

    /// Build a full bar tree expanded down to `lowest_level`.
    pub fn build(&self, lowest_level: usize) -> Result<RhythmTree> {
        if lowest_level > self.metre.lowest_level() {
            return Err(ConfigError::TreeTooDeep {
                requested: lowest_level,
                available: self.metre.lowest_level(),
            });
        }
        let mut tree = RhythmTree::new(self.metre.bar_duration(), 0, lowest_level);
        let root = tree.root();
        self.subdivide(&mut tree, root);
        Ok(tree)
    }

    /// Subdivide `node` down to the tree's lowest level.
    ///
    /// Nodes on the metre's ordinary grid use the metre's factor for their
    /// level; below a tuplet every split is binary.
    fn subdivide(&self, tree: &mut RhythmTree, node: NodeId) {
        let level = tree.duration_level(node);
        if level >= tree.lowest_level() {
            return;
        }
        let factor = if self.is_ordinary(tree, node) {
            self.metre.subdivision(level).unwrap_or(2)
        } else {
            2
        };
        let duration = tree.duration(node) / factor as f64;
        for _ in 0..factor {
            let child = tree.push_child(node, duration, level + 1);
            self.subdivide(tree, child);
        }
    }

    /// Whether `node` sits on the metre's ordinary grid (no tuplet above it).
    fn is_ordinary(&self, tree: &RhythmTree, node: NodeId) -> bool {
        let mut current = tree.parent(node);
        while let Some(id) = current {
            if tree.node(id).has_tuplet_children() {
                return false;
            }
            current = tree.parent(id);
        }
        true
    }

    /// Replace the children of `node` with a tuplet of `tuplet` items.
    ///
    /// Requires two ordinary levels below `node`. Each item lasts
    /// `duration / divisions` and is re-expanded by halving to the lowest
    /// level, so the subtree keeps its total duration.
    pub fn insert_tuplet(&self, tree: &mut RhythmTree, node: NodeId, tuplet: TupletType) -> Result<()> {
        let level = tree.duration_level(node);
        if level + TUPLET_ROOM > tree.lowest_level() {
            return Err(ConfigError::InsufficientDepth {
                divisions: tuplet.divisions(),
                level,
                lowest_level: tree.lowest_level(),
            });
        }

        tree.detach_children(node);
        tree.set_tuplet_children(node, true);

        let item_level = level + tuplet.level_offset();
        let duration = tree.duration(node) / tuplet.divisions() as f64;
        for _ in 0..tuplet.divisions() {
            let item = tree.push_child(node, duration, item_level);
            self.subdivide(tree, item);
        }
        debug!("inserted {tuplet} at level {level}, path {:?}", tree.path_of(node));
        Ok(())
    }

    /// Undo every tuplet in `tree`, rebuilding ordinary subdivisions.
    pub fn restore(&self, tree: &mut RhythmTree) {
        for node in tree.nodes_with_tuplet_children(tree.root()) {
            self.restore_node(tree, node);
        }
    }

    /// Clear the tuplet flag at `node` and rebuild its ordinary subtree.
    pub fn restore_node(&self, tree: &mut RhythmTree, node: NodeId) {
        tree.set_tuplet_children(node, false);
        tree.detach_children(node);
        self.subdivide(tree, node);
    }

    /// Walk the tree top-down and insert tuplets at random.
    ///
    /// At each node above the lowest level a tuplet is inserted with
    /// probability `tuplet_probability[level][accent]`; the type comes from
    /// `tuplet_type_weights[level]`. Nodes below an inserted tuplet are not
    /// visited, so tuplets never nest. Returns the tuplet nodes.
    pub fn add_tuplets<R: Rng + ?Sized>(
        &self,
        tree: &mut RhythmTree,
        tables: &RhythmTables,
        rng: &mut R,
    ) -> Result<Vec<NodeId>> {
        let mut inserted = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            let level = tree.duration_level(node);
            if level >= tree.lowest_level() {
                continue;
            }
            let p = tables.tuplet_probability(level, tree.metrical_accent(node));
            if p > 0.0 && probability::bernoulli(rng, p) {
                let tuplet = tables.decide_tuplet_type(level, rng)?;
                self.insert_tuplet(tree, node, tuplet)?;
                inserted.push(node);
                continue;
            }
            stack.extend(tree.children(node).iter().rev());
        }
        Ok(inserted)
    }
}
