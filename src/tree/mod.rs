//! Rhythm tree — the metrical subdivision hierarchy of one bar.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A node owns the
//! ordered list of its children's ids; the parent id is only used to walk
//! upwards. Tuplet surgery detaches whole subtrees: their nodes stay in the
//! arena but can no longer be reached from the root, so every traversal
//! starts from [`RhythmTree::root`].
//!
//! The navigation here is what the generator uses to answer "which onsets
//! can come next?" (see [`RhythmTree::duration_candidates`]).

pub mod factory;

pub use factory::{RhythmTreeFactory, TupletType};

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::metre::durations_equal;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which child to follow when descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildIndex {
    First,
    Last,
    Nth(usize),
}

/// One time-span of the bar.
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmNode {
    duration: f64,
    duration_level: usize,
    metrical_accent: usize,
    has_tuplet_children: bool,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl RhythmNode {
    /// Duration in quarter notes.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn duration_level(&self) -> usize {
        self.duration_level
    }

    /// Perceptual strength rank; lower is stronger.
    pub fn metrical_accent(&self) -> usize {
        self.metrical_accent
    }

    pub fn has_tuplet_children(&self) -> bool {
        self.has_tuplet_children
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Arena-backed subdivision tree of one bar (or one span of a bar).
#[derive(Debug, Clone)]
pub struct RhythmTree {
    nodes: Vec<RhythmNode>,
    root: NodeId,
    lowest_level: usize,
}

impl RhythmTree {
    /// Create a tree holding only a root node.
    ///
    /// The root's metrical accent is its own level.
    pub fn new(duration: f64, duration_level: usize, lowest_level: usize) -> Self {
        Self {
            nodes: vec![RhythmNode {
                duration,
                duration_level,
                metrical_accent: duration_level,
                has_tuplet_children: false,
                children: Vec::new(),
                parent: None,
            }],
            root: NodeId(0),
            lowest_level,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Deepest duration level the tree is expanded to.
    pub fn lowest_level(&self) -> usize {
        self.lowest_level
    }

    pub fn node(&self, id: NodeId) -> &RhythmNode {
        &self.nodes[id.0]
    }

    pub fn duration(&self, id: NodeId) -> f64 {
        self.node(id).duration
    }

    pub fn duration_level(&self, id: NodeId) -> usize {
        self.node(id).duration_level
    }

    pub fn metrical_accent(&self, id: NodeId) -> usize {
        self.node(id).metrical_accent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Append a child to `parent`.
    ///
    /// A first child inherits the parent's metrical accent, every later child
    /// takes its own duration level as accent.
    pub(crate) fn push_child(&mut self, parent: NodeId, duration: f64, duration_level: usize) -> NodeId {
        let metrical_accent = if self.node(parent).children.is_empty() {
            self.node(parent).metrical_accent
        } else {
            duration_level
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(RhythmNode {
            duration,
            duration_level,
            metrical_accent,
            has_tuplet_children: false,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Cut all children off `id`. The detached nodes become unreachable.
    pub(crate) fn detach_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub(crate) fn set_tuplet_children(&mut self, id: NodeId, value: bool) {
        self.nodes[id.0].has_tuplet_children = value;
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.parent(id).is_none()
    }

    /// Position of `id` among its siblings, `None` for the root.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// The root is not a first child.
    pub fn is_first_child(&self, id: NodeId) -> bool {
        self.index_in_parent(id) == Some(0)
    }

    /// The root counts as a last child: nothing follows it.
    pub fn is_last_child(&self, id: NodeId) -> bool {
        match (self.parent(id), self.index_in_parent(id)) {
            (Some(parent), Some(index)) => index + 1 == self.children(parent).len(),
            _ => true,
        }
    }

    pub fn right_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn left_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Nearest node on the path from `id` to the root that is not a last
    /// child; `id` itself qualifies. `None` when the whole path is made of
    /// last children, i.e. `id` ends the tree.
    pub fn first_ancestor_not_last_child(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if !self.is_last_child(current) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }

    pub fn child_at(&self, id: NodeId, index: ChildIndex) -> Option<NodeId> {
        let children = self.children(id);
        match index {
            ChildIndex::First => children.first().copied(),
            ChildIndex::Last => children.last().copied(),
            ChildIndex::Nth(i) => children.get(i).copied(),
        }
    }

    /// Follow `index` for `depth` levels below `id`.
    pub fn descendant_at_index(&self, id: NodeId, depth: usize, index: ChildIndex) -> Option<NodeId> {
        (0..depth).try_fold(id, |node, _| self.child_at(node, index))
    }

    /// Whether first children reach `depth` levels below `id`.
    pub fn has_descendant(&self, id: NodeId, depth: usize) -> bool {
        self.descendant_at_index(id, depth, ChildIndex::First).is_some()
    }

    /// Number of levels reachable below `id` along first children.
    pub fn levels_below(&self, id: NodeId) -> usize {
        self.leftmost_spine(id).len() - 1
    }

    /// `id` followed by first children down to a leaf.
    pub fn leftmost_spine(&self, id: NodeId) -> Vec<NodeId> {
        let mut spine = vec![id];
        let mut current = id;
        while let Some(first) = self.child_at(current, ChildIndex::First) {
            spine.push(first);
            current = first;
        }
        spine
    }

    /// Nodes that may start the next onset after `cursor`.
    ///
    /// With no pending dots the next free slot is the right sibling of
    /// `cursor`, or, when `cursor` closes its parent, the right sibling of the
    /// first ancestor that does not. With `pending_dots` dots the previous
    /// note borrowed time from its right sibling, so the search descends that
    /// many levels through last children first. Returns `None` at the end of
    /// the tree.
    pub fn duration_candidates(&self, cursor: NodeId, pending_dots: u8) -> Option<Vec<NodeId>> {
        if pending_dots > 0 {
            let sibling = self.right_sibling(cursor)?;
            let target = self.descendant_at_index(sibling, pending_dots as usize, ChildIndex::Last)?;
            return Some(self.leftmost_spine(target));
        }

        if self.is_root(cursor) {
            return Some(self.leftmost_spine(cursor));
        }
        let start = if self.is_last_child(cursor) {
            let ancestor = self.first_ancestor_not_last_child(cursor)?;
            self.right_sibling(ancestor)?
        } else {
            self.right_sibling(cursor)?
        };
        Some(self.leftmost_spine(start))
    }

    /// Top-most nodes below (and including) `id` whose children are a tuplet.
    pub fn nodes_with_tuplet_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if self.node(node).has_tuplet_children {
                found.push(node);
                continue;
            }
            stack.extend(self.children(node).iter().rev());
        }
        found
    }

    /// Whether `id` or anything below it has tuplet children.
    pub fn has_tuplet_descendants(&self, id: NodeId) -> bool {
        !self.nodes_with_tuplet_children(id).is_empty()
    }

    /// Node reached by following child indices from the root.
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |node, &i| self.child_at(node, ChildIndex::Nth(i)))
    }

    /// Child indices leading from the root to `id`.
    pub fn path_of(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(index) = self.index_in_parent(current) {
            path.push(index);
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Pre-order list of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Leaves of the subtree rooted at `id`, in time order.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| !self.node(n).has_children())
            .collect()
    }

    /// Compare two subtrees by shape, durations, levels, accents and tuplet
    /// flags. Node ids are ignored.
    pub fn same_structure(&self, a: NodeId, other: &RhythmTree, b: NodeId) -> bool {
        let (na, nb) = (self.node(a), other.node(b));
        durations_equal(na.duration, nb.duration)
            && na.duration_level == nb.duration_level
            && na.metrical_accent == nb.metrical_accent
            && na.has_tuplet_children == nb.has_tuplet_children
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(&ca, &cb)| self.same_structure(ca, other, cb))
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        writeln!(
            f,
            "{}{} (level {}, accent {}{})",
            "  ".repeat(depth),
            node.duration,
            node.duration_level,
            node.metrical_accent,
            if node.has_tuplet_children { ", tuplet" } else { "" }
        )?;
        for &child in &node.children {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl Index<NodeId> for RhythmTree {
    type Output = RhythmNode;

    fn index(&self, id: NodeId) -> &RhythmNode {
        self.node(id)
    }
}

impl PartialEq for RhythmTree {
    fn eq(&self, other: &Self) -> bool {
        self.lowest_level == other.lowest_level
            && self.same_structure(self.root, other, other.root)
    }
}

impl fmt::Display for RhythmTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)
    }
}
