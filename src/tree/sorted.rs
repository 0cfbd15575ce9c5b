//! Sorted insertion and value lookup.
//!
//! A tree used in sorted mode keeps its sorted runs in non-decreasing order
//! under a caller-supplied ordering. The ordering is passed to each call rather
//! than stored, so `V` needs no `Ord` unless the `Ord` shorthands are used.
//!
//! Runs can be flagged unsorted (a sort operator does this for an element
//! whose value changed but which has not been moved yet). Sorted insertion
//! never compares against an unsorted run: it compares against the next sorted
//! run after it instead, which costs a forward scan over unsorted neighbours.

use std::cmp::Ordering;

use super::{ColorTree, NONE, NodeHandle, NodeIdx};
use crate::color::{Color, ColorSet};
use crate::error::{Error, Result};

/// Which of several equal values a lookup should find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueBias {
    First,
    Last,
}

/// What a value lookup returns when no equal value exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// `None`.
    Exact,
    /// The index the value would be inserted at, computed without inserting.
    InsertionPoint,
}

impl<V> ColorTree<V> {
    /// The first sorted run at or after `idx`, or `NONE`.
    fn next_sorted(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && !self.node(idx).sorted {
            idx = self.successor(idx);
        }
        return idx;
    }

    pub fn is_sorted(&self, handle: NodeHandle) -> Result<bool> {
        let idx = self.resolve(handle)?;
        return Ok(self.node(idx).sorted);
    }

    /// Marks a run as taking part in (or excluded from) sorted comparisons.
    pub fn set_sorted(&mut self, handle: NodeHandle, sorted: bool) -> Result<()> {
        let idx = self.resolve(handle)?;
        self.node_mut(idx).sorted = sorted;
        return Ok(());
    }

    /// Inserts a run after every sorted run that is not greater than `value`.
    ///
    /// Equal values keep insertion order. Sorted insertion never folds runs,
    /// so every call yields a fresh node.
    pub fn add_in_sorted_order_by<F>(
        &mut self,
        color: Color,
        value: V,
        length: usize,
        mut cmp: F,
    ) -> Result<NodeHandle>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        self.check_color(color)?;
        if length == 0 {
            return Err(Error::ZeroLength);
        }

        if self.root == NONE {
            self.root = self.alloc(color, length, value, NONE);
            self.check_invariants();
            return Ok(self.handle(self.root));
        }

        let mut parent = self.root;
        let inserted = loop {
            let follower = self.next_sorted(parent);
            // past the last sorted run, everything goes on the left
            let insert_left = follower == NONE || cmp(&value, self.payload(follower)) == Ordering::Less;

            let child = if insert_left { self.node(parent).left } else { self.node(parent).right };
            if child != NONE {
                parent = child;
                continue;
            }

            let inserted = self.alloc(color, length, value, parent);
            if insert_left {
                self.node_mut(parent).left = inserted;
            } else {
                self.node_mut(parent).right = inserted;
            }
            self.grow_counts(parent, color, length);
            self.fix_height_post_change(parent, false);
            break inserted;
        };

        self.check_invariants();
        return Ok(self.handle(inserted));
    }

    /// The last sorted run at or before `idx`, or `NONE`.
    fn previous_sorted(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && !self.node(idx).sorted {
            idx = self.predecessor(idx);
        }
        return idx;
    }

    /// Counts the `view` elements in runs that sort before `value`.
    ///
    /// An unsorted run takes its key from a sorted neighbour: the previous one
    /// when `inclusive` is false, the next one when it is true. Either way the
    /// keys never decrease along the sequence, so one descent suffices. With
    /// `inclusive` the count also takes in runs equal to `value`, and it is
    /// exactly where sorted insertion would place `value`.
    fn count_sorted_before<F>(&self, value: &V, view: ColorSet, inclusive: bool, cmp: &mut F) -> usize
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut result = 0;
        let mut idx = self.root;
        while idx != NONE {
            let node = self.node(idx);
            let go_left = if inclusive {
                let key = self.next_sorted(idx);
                key == NONE || cmp(value, self.payload(key)) == Ordering::Less
            } else {
                let key = self.previous_sorted(idx);
                key != NONE && cmp(value, self.payload(key)) != Ordering::Greater
            };
            if go_left {
                idx = node.left;
                continue;
            }
            result += self.subtree_size(node.left, view);
            result += self.node_size(idx, view);
            idx = node.right;
        }
        return result;
    }

    /// Whether `idx` is a sorted run visible in `view` holding `value`.
    fn is_visible_match<F>(&self, idx: NodeIdx, value: &V, view: ColorSet, cmp: &mut F) -> bool
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let node = self.node(idx);
        return node.sorted && view.contains(node.color) && cmp(value, self.payload(idx)) == Ordering::Equal;
    }

    /// Finds `value` among the sorted runs, returning its index within `view`.
    ///
    /// `bias` picks the first or last of several equal elements. Only sorted
    /// runs whose color is in `view` count as matches; unsorted runs and runs
    /// outside `view` are stepped over. With [`Lookup::InsertionPoint`] a
    /// missing value yields the index sorted insertion would give it; with
    /// [`Lookup::Exact`] it yields `None`.
    pub fn index_of_value_by<F>(
        &self,
        value: &V,
        bias: ValueBias,
        lookup: Lookup,
        view: ColorSet,
        mut cmp: F,
    ) -> Option<usize>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let lower = self.count_sorted_before(value, view, false, &mut cmp);
        let upper = self.count_sorted_before(value, view, true, &mut cmp);

        // visible elements in [lower, upper) belong to unsorted runs or to
        // sorted runs equal to `value`; scan inward past the unsorted ones
        let found = match bias {
            ValueBias::First if lower < upper => {
                let (mut idx, _) = self.locate(lower, view);
                loop {
                    if idx == NONE {
                        break None;
                    }
                    if self.is_visible_match(idx, value, view, &mut cmp) {
                        break Some(self.index_of_idx(idx, view));
                    }
                    if self.node(idx).sorted && cmp(value, self.payload(idx)) == Ordering::Less {
                        break None;
                    }
                    idx = self.successor(idx);
                }
            }
            ValueBias::Last if lower < upper => {
                let (mut idx, _) = self.locate(upper - 1, view);
                loop {
                    if idx == NONE {
                        break None;
                    }
                    if self.is_visible_match(idx, value, view, &mut cmp) {
                        break Some(self.index_of_idx(idx, view) + self.node_size(idx, view) - 1);
                    }
                    if self.node(idx).sorted && cmp(value, self.payload(idx)) == Ordering::Greater {
                        break None;
                    }
                    idx = self.predecessor(idx);
                }
            }
            _ => None,
        };

        if found.is_some() {
            return found;
        }
        return match lookup {
            Lookup::Exact => None,
            Lookup::InsertionPoint => Some(upper),
        };
    }

    /// Panics if the sorted runs are out of order under `cmp`.
    pub fn validate_sorted_by<F>(&self, mut cmp: F)
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut previous = NONE;
        let mut idx = self.next_sorted(self.leftmost(self.root));
        while idx != NONE {
            if previous != NONE {
                assert!(
                    cmp(self.payload(previous), self.payload(idx)) != Ordering::Greater,
                    "INVARIANT VIOLATED: run {} sorts before its predecessor {}",
                    idx,
                    previous
                );
            }
            previous = idx;
            idx = self.next_sorted(self.successor(idx));
        }
    }
}

impl<V: Ord> ColorTree<V> {
    /// [`add_in_sorted_order_by`](Self::add_in_sorted_order_by) under `V`'s
    /// own ordering.
    pub fn add_in_sorted_order(&mut self, color: Color, value: V, length: usize) -> Result<NodeHandle> {
        return self.add_in_sorted_order_by(color, value, length, V::cmp);
    }

    pub fn index_of_value(&self, value: &V, bias: ValueBias, lookup: Lookup, view: ColorSet) -> Option<usize> {
        return self.index_of_value_by(value, bias, lookup, view, V::cmp);
    }
}
