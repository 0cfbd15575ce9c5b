//! Color Tree
//!
//! An AVL tree over a run-length compressed sequence in which every element
//! carries one [`Color`]. Positions are always measured inside a view, a
//! [`ColorSet`]: the index of an element under a view counts only the
//! elements before it whose color is in that view. One physical sequence can
//! therefore answer positional questions for several overlapping lists at
//! once, such as the source list and the filtered list of a filter operator.
//!
//! Structure:
//! - Each node is a run of `len` elements with one color and one value
//! - Each node caches, per color, the number of elements in its subtree
//! - All nodes live in one `Vec` arena, linked by `u32` indices
//!
//! Operations:
//! - `size`: O(1) - read from the root's aggregate
//! - `add` / `remove` / `get`: O(log n)
//! - `index_of_node` / `convert_index_color`: O(log n) - walk to the root
//! - `set_color`: O(log n) - fix ancestor aggregates, no restructuring
//!
//! ```text
//!                 [B x5 "Jan"]  counts: A=5 B=5
//!                /
//!     [A x5 "Mar"]              counts: A=5
//!
//! view {A,B}: AAAAABBBBB      view {B}: BBBBB
//! ```
//!
//! Rotations recompute the per-color aggregate of the two nodes they move, so
//! every structural operation stays O(#colors * log n).

mod iter;
mod node;
mod sorted;

use std::cmp::max;

use smallvec::SmallVec;
use tracing::trace;

use crate::color::{Color, ColorCoder, ColorSet, MAX_COLORS};
use crate::error::{Error, Result};

pub use iter::{Elements, Run, Runs, TreeIterator};
pub use node::NodeHandle;
pub use sorted::{Lookup, ValueBias};

pub(crate) use node::{NONE, Node, NodeIdx};

/// A run-length compressed sequence of colored values, balanced as an AVL tree.
#[derive(Clone, Debug)]
pub struct ColorTree<V> {
    /// Arena of nodes, live and free.
    nodes: Vec<Node<V>>,
    /// Root node, or `NONE` for an empty tree.
    root: NodeIdx,
    /// Free slots available for reuse.
    free_list: Vec<NodeIdx>,
    /// Number of live nodes.
    live: usize,
    coder: ColorCoder,
}

impl<V> ColorTree<V> {
    /// Creates an empty tree whose colors are named by `coder`.
    pub fn new(coder: ColorCoder) -> ColorTree<V> {
        return ColorTree {
            nodes: Vec::new(),
            root: NONE,
            free_list: Vec::new(),
            live: 0,
            coder,
        };
    }

    pub fn coder(&self) -> &ColorCoder {
        return &self.coder;
    }

    /// Number of elements whose color is in `view`.
    #[inline]
    pub fn size(&self, view: ColorSet) -> usize {
        return self.subtree_size(self.root, view);
    }

    /// Number of runs, which is at most the number of elements.
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        return self.live;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.root == NONE;
    }

    /// Removes every element. All outstanding handles go stale.
    pub fn clear(&mut self) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if node.is_live() {
                node.value = None;
                node.generation = node.generation.wrapping_add(1);
                self.free_list.push(i as NodeIdx);
            }
        }
        self.root = NONE;
        self.live = 0;
    }

    // --- Node access helpers ---

    #[inline(always)]
    pub(crate) fn node(&self, idx: NodeIdx) -> &Node<V> {
        return &self.nodes[idx as usize];
    }

    #[inline(always)]
    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<V> {
        return &mut self.nodes[idx as usize];
    }

    /// Value of a node linked into the tree.
    pub(crate) fn payload(&self, idx: NodeIdx) -> &V {
        match &self.node(idx).value {
            Some(value) => return value,
            None => unreachable!("free slot {idx} is linked into the tree"),
        }
    }

    #[inline(always)]
    fn height(&self, idx: NodeIdx) -> u8 {
        if idx == NONE {
            return 0;
        }
        return self.node(idx).height;
    }

    /// Elements of the subtree rooted at `idx` whose color is in `view`.
    #[inline]
    pub(crate) fn subtree_size(&self, idx: NodeIdx, view: ColorSet) -> usize {
        if idx == NONE {
            return 0;
        }
        let counts = &self.node(idx).counts;
        return view.iter().map(|color| counts[color.index()]).sum();
    }

    /// Elements of the run at `idx` alone that are visible in `view`.
    #[inline(always)]
    pub(crate) fn node_size(&self, idx: NodeIdx, view: ColorSet) -> usize {
        let node = self.node(idx);
        if view.contains(node.color) {
            return node.len;
        }
        return 0;
    }

    pub(crate) fn handle(&self, idx: NodeIdx) -> NodeHandle {
        return NodeHandle { index: idx, generation: self.node(idx).generation };
    }

    fn resolve(&self, handle: NodeHandle) -> Result<NodeIdx> {
        match self.nodes.get(handle.index as usize) {
            Some(node) if node.is_live() && node.generation == handle.generation => {
                return Ok(handle.index);
            }
            _ => return Err(Error::StaleHandle),
        }
    }

    fn check_color(&self, color: Color) -> Result<()> {
        if !self.coder.is_registered(color) {
            return Err(Error::InvalidColor(color.bits()));
        }
        return Ok(());
    }

    fn alloc(&mut self, color: Color, len: usize, value: V, parent: NodeIdx) -> NodeIdx {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            self.node_mut(idx).reuse(color, len, value, parent);
            return idx;
        }
        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(Node::new(color, len, value, parent));
        return idx;
    }

    fn free(&mut self, idx: NodeIdx) -> Option<V> {
        let node = self.node_mut(idx);
        let value = node.value.take();
        node.generation = node.generation.wrapping_add(1);
        node.parent = NONE;
        node.left = NONE;
        node.right = NONE;
        self.free_list.push(idx);
        self.live -= 1;
        return value;
    }

    // --- Aggregate maintenance ---

    /// Adds `n` elements of `color` to `idx` and all of its ancestors.
    fn grow_counts(&mut self, mut idx: NodeIdx, color: Color, n: usize) {
        while idx != NONE {
            let node = self.node_mut(idx);
            node.counts[color.index()] += n;
            idx = node.parent;
        }
    }

    /// Removes `n` elements of `color` from `idx` and all of its ancestors.
    fn shrink_counts(&mut self, mut idx: NodeIdx, color: Color, n: usize) {
        while idx != NONE {
            let node = self.node_mut(idx);
            node.counts[color.index()] -= n;
            idx = node.parent;
        }
    }

    /// Recomputes height and aggregates of `idx` from its children.
    fn refresh(&mut self, idx: NodeIdx) {
        let node = self.node(idx);
        let (left, right) = (node.left, node.right);
        let mut counts = [0; MAX_COLORS];
        counts[node.color.index()] = node.len;
        for child in [left, right] {
            if child != NONE {
                for (total, n) in counts.iter_mut().zip(self.node(child).counts) {
                    *total += n;
                }
            }
        }
        let height = max(self.height(left), self.height(right)) + 1;
        let node = self.node_mut(idx);
        node.counts = counts;
        node.height = height;
    }

    // --- Structure ---

    /// Points whatever referenced `old` as a child (or the root) at `new`.
    fn replace_child(&mut self, parent: NodeIdx, old: NodeIdx, new: NodeIdx) {
        if parent == NONE {
            self.root = new;
            return;
        }
        let node = self.node_mut(parent);
        if node.left == old {
            node.left = new;
        } else {
            node.right = new;
        }
    }

    /// Promotes the left child of `idx`, returning the new subtree root.
    fn rotate_right(&mut self, idx: NodeIdx) -> NodeIdx {
        let pivot = self.node(idx).left;
        let moved = self.node(pivot).right;
        let parent = self.node(idx).parent;

        self.node_mut(idx).left = moved;
        if moved != NONE {
            self.node_mut(moved).parent = idx;
        }
        self.node_mut(pivot).right = idx;
        self.node_mut(idx).parent = pivot;
        self.node_mut(pivot).parent = parent;
        self.replace_child(parent, idx, pivot);

        self.refresh(idx);
        self.refresh(pivot);
        trace!(node = idx, pivot, "rotate right");
        return pivot;
    }

    /// Promotes the right child of `idx`, returning the new subtree root.
    fn rotate_left(&mut self, idx: NodeIdx) -> NodeIdx {
        let pivot = self.node(idx).right;
        let moved = self.node(pivot).left;
        let parent = self.node(idx).parent;

        self.node_mut(idx).right = moved;
        if moved != NONE {
            self.node_mut(moved).parent = idx;
        }
        self.node_mut(pivot).left = idx;
        self.node_mut(idx).parent = pivot;
        self.node_mut(pivot).parent = parent;
        self.replace_child(parent, idx, pivot);

        self.refresh(idx);
        self.refresh(pivot);
        trace!(node = idx, pivot, "rotate left");
        return pivot;
    }

    /// Restores heights and balance from `idx` upward.
    ///
    /// Insertions stop at the first node whose height did not change; removals
    /// can shorten a subtree after a rotation, so they walk to the root.
    fn fix_height_post_change(&mut self, idx: NodeIdx, all_the_way_to_root: bool) {
        let mut current = idx;
        while current != NONE {
            let left = self.node(current).left;
            let right = self.node(current).right;
            let left_height = self.height(left);
            let right_height = self.height(right);

            if left_height > right_height + 1 {
                let inner = self.node(left);
                if self.height(inner.right) > self.height(inner.left) {
                    self.rotate_left(left);
                }
                current = self.rotate_right(current);
            } else if right_height > left_height + 1 {
                let inner = self.node(right);
                if self.height(inner.left) > self.height(inner.right) {
                    self.rotate_right(right);
                }
                current = self.rotate_left(current);
            }

            let node = self.node(current);
            let new_height = max(self.height(node.left), self.height(node.right)) + 1;
            if !all_the_way_to_root && node.height == new_height {
                return;
            }
            self.node_mut(current).height = new_height;
            current = self.node(current).parent;
        }
    }

    pub(crate) fn leftmost(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && self.node(idx).left != NONE {
            idx = self.node(idx).left;
        }
        return idx;
    }

    pub(crate) fn rightmost(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && self.node(idx).right != NONE {
            idx = self.node(idx).right;
        }
        return idx;
    }

    /// In-order successor, or `NONE` after the last run.
    pub(crate) fn successor(&self, idx: NodeIdx) -> NodeIdx {
        let right = self.node(idx).right;
        if right != NONE {
            return self.leftmost(right);
        }
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE && self.node(parent).right == child {
            child = parent;
            parent = self.node(parent).parent;
        }
        return parent;
    }

    /// In-order predecessor, or `NONE` before the first run.
    pub(crate) fn predecessor(&self, idx: NodeIdx) -> NodeIdx {
        let left = self.node(idx).left;
        if left != NONE {
            return self.rightmost(left);
        }
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE && self.node(parent).left == child {
            child = parent;
            parent = self.node(parent).parent;
        }
        return parent;
    }

    /// Finds the run holding `index` under `view`, and the offset within it.
    /// Requires `index < self.size(view)`.
    pub(crate) fn locate(&self, mut index: usize, view: ColorSet) -> (NodeIdx, usize) {
        let mut idx = self.root;
        loop {
            let node = self.node(idx);
            let left_size = self.subtree_size(node.left, view);
            if index < left_size {
                idx = node.left;
                continue;
            }
            index -= left_size;
            let size = self.node_size(idx, view);
            if index < size {
                return (idx, index);
            }
            index -= size;
            idx = node.right;
        }
    }

    /// Elements of `view` that precede the first element of run `idx`.
    pub(crate) fn index_of_idx(&self, idx: NodeIdx, view: ColorSet) -> usize {
        let mut index = self.subtree_size(self.node(idx).left, view);
        let mut child = idx;
        let mut parent = self.node(idx).parent;
        while parent != NONE {
            let node = self.node(parent);
            if node.right == child {
                index += self.subtree_size(node.left, view);
                index += self.node_size(parent, view);
            }
            child = parent;
            parent = node.parent;
        }
        return index;
    }

    // --- Queries ---

    /// The run occupying `index` within `view`.
    pub fn get(&self, index: usize, view: ColorSet) -> Result<NodeHandle> {
        let size = self.size(view);
        if index >= size {
            return Err(Error::IndexOutOfRange { index, size });
        }
        let (idx, _) = self.locate(index, view);
        return Ok(self.handle(idx));
    }

    /// Position, within `view`, of the first element of the run `handle`.
    ///
    /// If the run's color is outside `view`, this is the number of `view`
    /// elements before it, the position the run would occupy.
    pub fn index_of_node(&self, handle: NodeHandle, view: ColorSet) -> Result<usize> {
        let idx = self.resolve(handle)?;
        return Ok(self.index_of_idx(idx, view));
    }

    /// Translates a position in view `from` into view `to`.
    ///
    /// When the element at `index` is not visible in `to`, the result counts
    /// only the `to` elements before it, so it rounds toward the start of the
    /// element's run. `index == size(from)` maps to `size(to)`.
    pub fn convert_index_color(&self, index: usize, from: ColorSet, to: ColorSet) -> Result<usize> {
        let size = self.size(from);
        if index > size {
            return Err(Error::IndexOutOfRange { index, size });
        }
        if index == size {
            return Ok(self.size(to));
        }
        let (idx, offset) = self.locate(index, from);
        let mut result = self.index_of_idx(idx, to);
        if to.contains(self.node(idx).color) {
            result += offset;
        }
        return Ok(result);
    }

    pub fn value(&self, handle: NodeHandle) -> Result<&V> {
        let idx = self.resolve(handle)?;
        return Ok(self.payload(idx));
    }

    pub fn value_mut(&mut self, handle: NodeHandle) -> Result<&mut V> {
        let idx = self.resolve(handle)?;
        return self.node_mut(idx).value.as_mut().ok_or(Error::StaleHandle);
    }

    /// Replaces the value shared by every element of the run.
    pub fn set_value(&mut self, handle: NodeHandle, value: V) -> Result<V> {
        let slot = self.value_mut(handle)?;
        return Ok(std::mem::replace(slot, value));
    }

    pub fn color(&self, handle: NodeHandle) -> Result<Color> {
        let idx = self.resolve(handle)?;
        return Ok(self.node(idx).color);
    }

    /// Number of elements in the run.
    pub fn run_len(&self, handle: NodeHandle) -> Result<usize> {
        let idx = self.resolve(handle)?;
        return Ok(self.node(idx).len);
    }

    pub fn first(&self) -> Option<NodeHandle> {
        if self.root == NONE {
            return None;
        }
        return Some(self.handle(self.leftmost(self.root)));
    }

    pub fn last(&self) -> Option<NodeHandle> {
        if self.root == NONE {
            return None;
        }
        return Some(self.handle(self.rightmost(self.root)));
    }

    /// The run physically after `handle`, whatever its color.
    pub fn next_node(&self, handle: NodeHandle) -> Result<Option<NodeHandle>> {
        let next = self.successor(self.resolve(handle)?);
        return Ok((next != NONE).then(|| self.handle(next)));
    }

    /// The run physically before `handle`, whatever its color.
    pub fn previous_node(&self, handle: NodeHandle) -> Result<Option<NodeHandle>> {
        let previous = self.predecessor(self.resolve(handle)?);
        return Ok((previous != NONE).then(|| self.handle(previous)));
    }

    /// One color name per element, in order. Mostly for tests and debugging.
    pub fn as_sequence_of_colors(&self) -> String {
        let mut result = String::new();
        let mut idx = self.leftmost(self.root);
        while idx != NONE {
            let node = self.node(idx);
            let name = self.coder.name(node.color).unwrap_or("?");
            for _ in 0..node.len {
                result.push_str(name);
            }
            idx = self.successor(idx);
        }
        return result;
    }

    // --- Mutations ---

    /// Recolors the run in place. Order is unchanged, so nothing rotates.
    pub fn set_color(&mut self, handle: NodeHandle, color: Color) -> Result<()> {
        self.check_color(color)?;
        let idx = self.resolve(handle)?;
        let node = self.node(idx);
        let (old, len) = (node.color, node.len);
        if old == color {
            return Ok(());
        }
        self.shrink_counts(idx, old, len);
        self.node_mut(idx).color = color;
        self.grow_counts(idx, color, len);
        self.check_invariants();
        return Ok(());
    }

    /// Removes the run `handle`, returning its value.
    pub fn remove_node(&mut self, handle: NodeHandle) -> Result<V> {
        let idx = self.resolve(handle)?;
        let node = self.node(idx);
        let (color, len) = (node.color, node.len);
        self.node_mut(idx).len = 0;
        self.shrink_counts(idx, color, len);
        let value = self.delete_node(idx);
        self.check_invariants();
        return value.ok_or(Error::StaleHandle);
    }

    /// Removes `length` elements of `view` starting at `index`.
    ///
    /// Elements outside `view` are left in place, even when they sit between
    /// removed ones. Fails without touching the tree if fewer than `length`
    /// elements of `view` exist from `index` onward; that failure, including
    /// an `index` past the end of `view`, is reported as
    /// [`Error::RangeOutOfBounds`] rather than [`Error::IndexOutOfRange`].
    pub fn remove(&mut self, index: usize, view: ColorSet, length: usize) -> Result<()> {
        let size = self.size(view);
        if index > size || length > size - index {
            return Err(Error::RangeOutOfBounds { index, length, size });
        }
        if length == 0 {
            return Ok(());
        }

        let mut emptied = SmallVec::<[NodeIdx; 8]>::new();
        self.remove_from_subtree(self.root, index, view, length, &mut emptied);
        for idx in emptied {
            self.delete_node(idx);
        }
        self.check_invariants();
        return Ok(());
    }

    /// Shortens runs covering the range; runs that reach zero are collected in
    /// `emptied` and unlinked afterwards, so no structure moves mid-walk.
    fn remove_from_subtree(
        &mut self,
        mut idx: NodeIdx,
        mut index: usize,
        view: ColorSet,
        mut length: usize,
        emptied: &mut SmallVec<[NodeIdx; 8]>,
    ) {
        while length > 0 {
            let left = self.node(idx).left;
            let mut left_size = self.subtree_size(left, view);

            if index < left_size {
                if index + length > left_size {
                    let head = left_size - index;
                    self.remove_from_subtree(left, index, view, head, emptied);
                    length -= head;
                    left_size -= head;
                } else {
                    self.remove_from_subtree(left, index, view, length, emptied);
                    return;
                }
            }

            let mut right_start = left_size + self.node_size(idx, view);
            if index < right_start {
                let taken = (right_start - index).min(length);
                let color = self.node(idx).color;
                self.node_mut(idx).len -= taken;
                self.shrink_counts(idx, color, taken);
                length -= taken;
                right_start -= taken;
                if self.node(idx).len == 0 {
                    emptied.push(idx);
                }
                if length == 0 {
                    return;
                }
            }

            index -= right_start;
            idx = self.node(idx).right;
        }
    }

    /// Unlinks an empty run and frees its slot.
    ///
    /// A node with two children is replaced by the extremal node of its taller
    /// subtree (the right one on a tie), and rebalancing starts where the
    /// replacement was taken from.
    fn delete_node(&mut self, idx: NodeIdx) -> Option<V> {
        debug_assert_eq!(self.node(idx).len, 0);
        let node = self.node(idx);
        let (left, right, parent) = (node.left, node.right, node.parent);

        if left == NONE || right == NONE {
            let child = if left != NONE { left } else { right };
            self.replace_child(parent, idx, child);
            if child != NONE {
                self.node_mut(child).parent = parent;
            }
            self.fix_height_post_change(parent, true);
            trace!(node = idx, "unlinked run");
            return self.free(idx);
        }

        let from_left = self.height(left) > self.height(right);
        let replacement = if from_left { self.rightmost(left) } else { self.leftmost(right) };
        let replacement_node = self.node(replacement);
        let (color, len, origin) = (replacement_node.color, replacement_node.len, replacement_node.parent);
        let orphan = if from_left { replacement_node.left } else { replacement_node.right };

        // lift the replacement out of its subtree
        self.replace_child(origin, replacement, orphan);
        if orphan != NONE {
            self.node_mut(orphan).parent = origin;
        }
        let mut walk = origin;
        while walk != idx {
            let node = self.node_mut(walk);
            node.counts[color.index()] -= len;
            walk = node.parent;
        }

        // and drop it into the deleted node's place
        let node = self.node(idx);
        let (left, right, height) = (node.left, node.right, node.height);
        let moved = self.node_mut(replacement);
        moved.left = left;
        moved.right = right;
        moved.parent = parent;
        moved.height = height;
        for child in [left, right] {
            if child != NONE {
                self.node_mut(child).parent = replacement;
            }
        }
        self.replace_child(parent, idx, replacement);
        self.refresh(replacement);

        let start = if origin == idx { replacement } else { origin };
        self.fix_height_post_change(start, true);
        trace!(node = idx, replacement, "replaced run");
        return self.free(idx);
    }

    // --- Invariant checking ---

    /// Checks every structural invariant, panicking on the first violation.
    ///
    /// A failure means the tree itself is broken, not that it was misused.
    pub fn validate(&self) {
        if self.root != NONE {
            assert_eq!(
                self.node(self.root).parent,
                NONE,
                "INVARIANT VIOLATED: root {} has a parent",
                self.root
            );
        }
        let (_, reachable) = self.validate_subtree(self.root);
        assert_eq!(
            reachable, self.live,
            "INVARIANT VIOLATED: {} runs reachable but {} live",
            reachable, self.live
        );
    }

    /// Returns the height and node count of the subtree at `idx`.
    fn validate_subtree(&self, idx: NodeIdx) -> (u8, usize) {
        if idx == NONE {
            return (0, 0);
        }
        let node = self.node(idx);
        assert!(node.is_live(), "INVARIANT VIOLATED: free slot {} is linked", idx);
        assert!(node.len >= 1, "INVARIANT VIOLATED: run {} is empty", idx);
        for child in [node.left, node.right] {
            if child != NONE {
                assert_eq!(
                    self.node(child).parent,
                    idx,
                    "INVARIANT VIOLATED: child {} does not point back at {}",
                    child,
                    idx
                );
            }
        }

        let (left_height, left_nodes) = self.validate_subtree(node.left);
        let (right_height, right_nodes) = self.validate_subtree(node.right);
        assert!(
            left_height.abs_diff(right_height) <= 1,
            "INVARIANT VIOLATED: run {} unbalanced, heights {} and {}",
            idx,
            left_height,
            right_height
        );
        let height = max(left_height, right_height) + 1;
        assert_eq!(node.height, height, "INVARIANT VIOLATED: stale height at {}", idx);

        let mut counts = [0; MAX_COLORS];
        counts[node.color.index()] = node.len;
        for child in [node.left, node.right] {
            if child != NONE {
                for (total, n) in counts.iter_mut().zip(self.node(child).counts) {
                    *total += n;
                }
            }
        }
        assert_eq!(node.counts, counts, "INVARIANT VIOLATED: stale counts at {}", idx);

        return (height, left_nodes + right_nodes + 1);
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        self.validate();
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_invariants(&self) {}
}

impl<V: Clone + PartialEq> ColorTree<V> {
    /// Inserts `length` elements of `color`, all holding `value`, so that the
    /// first of them lands at `index` within `view`.
    ///
    /// If the run met on the way down has the same color and an equal value,
    /// it grows instead and its handle is returned. Inserting into the middle
    /// of a different run splits it in two.
    pub fn add(
        &mut self,
        index: usize,
        view: ColorSet,
        color: Color,
        value: V,
        length: usize,
    ) -> Result<NodeHandle> {
        self.check_color(color)?;
        if length == 0 {
            return Err(Error::ZeroLength);
        }
        let size = self.size(view);
        if index > size {
            return Err(Error::IndexOutOfRange { index, size });
        }

        let inserted = if self.root == NONE {
            self.root = self.alloc(color, length, value, NONE);
            self.root
        } else {
            self.insert_into_subtree(self.root, index, view, color, value, length, true)
        };
        self.check_invariants();
        return Ok(self.handle(inserted));
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_into_subtree(
        &mut self,
        mut parent: NodeIdx,
        mut index: usize,
        view: ColorSet,
        color: Color,
        value: V,
        length: usize,
        fold: bool,
    ) -> NodeIdx {
        loop {
            let parent_left = self.node(parent).left;
            let left_size = self.subtree_size(parent_left, view);
            let mut right_start = left_size + self.node_size(parent, view);

            // growing the run we are standing on is the cheapest option
            if fold && index >= left_size && index <= right_start {
                let node = self.node(parent);
                if node.color == color && node.value.as_ref() == Some(&value) {
                    self.node_mut(parent).len += length;
                    self.grow_counts(parent, color, length);
                    trace!(node = parent, length, "folded into run");
                    return parent;
                }
            }

            if index <= left_size {
                if parent_left == NONE {
                    let inserted = self.alloc(color, length, value, parent);
                    self.node_mut(parent).left = inserted;
                    self.grow_counts(parent, color, length);
                    self.fix_height_post_change(parent, false);
                    return inserted;
                }
                parent = parent_left;
                continue;
            }

            if index < right_start {
                // split: the tail of this run moves into a new node on its right
                let tail = right_start - index;
                let parent_color = self.node(parent).color;
                self.node_mut(parent).len -= tail;
                self.shrink_counts(parent, parent_color, tail);
                let tail_value = self.payload(parent).clone();
                self.insert_into_subtree(parent, index, view, parent_color, tail_value, tail, false);
                right_start = left_size + self.node_size(parent, view);
                trace!(node = parent, tail, "split run");
            }

            let parent_right = self.node(parent).right;
            if parent_right == NONE {
                let inserted = self.alloc(color, length, value, parent);
                self.node_mut(parent).right = inserted;
                self.grow_counts(parent, color, length);
                self.fix_height_post_change(parent, false);
                return inserted;
            }
            index -= right_start;
            parent = parent_right;
        }
    }
}
