//! Forward traversal of a [`ColorTree`] filtered by a view.
//!
//! [`TreeIterator`] is a cursor: it sits on one element (or before the first)
//! and remembers, per color, how many elements lie before it. That makes the
//! current index under any view an O(#colors) sum, and lets a caller step by
//! element under one view and read positions under another.
//!
//! The cursor borrows the tree, so the tree cannot change while one is live.

use super::{ColorTree, NONE, NodeHandle, NodeIdx};
use crate::color::{Color, ColorSet, MAX_COLORS};
use crate::error::{Error, Result};

/// A forward-only cursor over the elements of a [`ColorTree`].
#[derive(Clone, Debug)]
pub struct TreeIterator<'a, V> {
    tree: &'a ColorTree<V>,
    /// Current run, or `NONE` before the first step.
    node: NodeIdx,
    /// Position of the current element within its run.
    offset: usize,
    /// Elements of each color strictly before the current element.
    counts: [usize; MAX_COLORS],
}

impl<'a, V> TreeIterator<'a, V> {
    /// A cursor positioned before the first element.
    pub fn new(tree: &'a ColorTree<V>) -> TreeIterator<'a, V> {
        return TreeIterator {
            tree,
            node: NONE,
            offset: 0,
            counts: [0; MAX_COLORS],
        };
    }

    /// A cursor whose next element under `view` is the one at `next_index`.
    pub fn starting_at(tree: &'a ColorTree<V>, next_index: usize, view: ColorSet) -> Result<TreeIterator<'a, V>> {
        if next_index == 0 {
            return Ok(TreeIterator::new(tree));
        }
        let size = tree.size(view);
        if next_index > size {
            return Err(Error::IndexOutOfRange { index: next_index, size });
        }

        let (node, offset) = tree.locate(next_index - 1, view);
        let mut counts = [0; MAX_COLORS];
        for color in tree.coder().all().iter() {
            counts[color.index()] = tree.index_of_idx(node, color.into());
        }
        counts[tree.node(node).color.index()] += offset;

        return Ok(TreeIterator { tree, node, offset, counts });
    }

    #[inline]
    fn count_in(&self, view: ColorSet) -> usize {
        return view.iter().map(|color| self.counts[color.index()]).sum();
    }

    #[inline]
    fn on_view(&self, view: ColorSet) -> bool {
        return self.node != NONE && view.contains(self.tree.node(self.node).color);
    }

    /// Index of the current element under `view`. If the element is outside
    /// `view`, this is the number of `view` elements before it.
    pub fn index(&self, view: ColorSet) -> usize {
        return self.count_in(view);
    }

    pub fn has_next(&self, view: ColorSet) -> bool {
        let size = self.tree.size(view);
        if self.node == NONE {
            return size > 0;
        }
        if self.on_view(view) {
            return self.index(view) + 1 < size;
        }
        return self.index(view) < size;
    }

    /// Steps to the next element visible in `view`, returning its run.
    pub fn next(&mut self, view: ColorSet) -> Option<NodeHandle> {
        if !self.has_next(view) {
            return None;
        }

        if self.node == NONE {
            self.node = self.tree.leftmost(self.tree.root);
            self.offset = 0;
            if self.on_view(view) {
                return Some(self.tree.handle(self.node));
            }
        } else if self.on_view(view) && self.offset + 1 < self.tree.node(self.node).len {
            let color = self.tree.node(self.node).color;
            self.counts[color.index()] += 1;
            self.offset += 1;
            return Some(self.tree.handle(self.node));
        }

        self.skip_to_view(view);
        return Some(self.tree.handle(self.node));
    }

    pub fn has_next_node(&self, view: ColorSet) -> bool {
        if self.node == NONE {
            return self.tree.size(view) > 0;
        }
        return self.node_end_index(view) < self.tree.size(view);
    }

    /// Steps to the first element of the next run visible in `view`.
    pub fn next_node(&mut self, view: ColorSet) -> Option<NodeHandle> {
        if !self.has_next_node(view) {
            return None;
        }

        if self.node == NONE {
            self.node = self.tree.leftmost(self.tree.root);
            self.offset = 0;
            if self.on_view(view) {
                return Some(self.tree.handle(self.node));
            }
        }

        self.skip_to_view(view);
        return Some(self.tree.handle(self.node));
    }

    /// Leaves the current run and stops on the first run visible in `view`.
    /// Callers guarantee such a run exists.
    fn skip_to_view(&mut self, view: ColorSet) {
        loop {
            let node = self.tree.node(self.node);
            self.counts[node.color.index()] += node.len - self.offset;
            self.node = self.tree.successor(self.node);
            self.offset = 0;
            if self.on_view(view) {
                return;
            }
        }
    }

    /// Index under `view` of the current run's first element.
    pub fn node_start_index(&self, view: ColorSet) -> usize {
        let mut result = self.count_in(view);
        if self.on_view(view) {
            result -= self.offset;
        }
        return result;
    }

    /// Index under `view` just past the current run.
    pub fn node_end_index(&self, view: ColorSet) -> usize {
        return self.node_start_index(view) + self.node_len(view);
    }

    /// Elements of the current run visible in `view`.
    pub fn node_len(&self, view: ColorSet) -> usize {
        if self.node == NONE {
            return 0;
        }
        return self.tree.node_size(self.node, view);
    }

    pub fn node(&self) -> Option<NodeHandle> {
        return (self.node != NONE).then(|| self.tree.handle(self.node));
    }

    pub fn value(&self) -> Option<&'a V> {
        if self.node == NONE {
            return None;
        }
        return Some(self.tree.payload(self.node));
    }

    pub fn color(&self) -> Option<Color> {
        return (self.node != NONE).then(|| self.tree.node(self.node).color);
    }
}

/// One run as seen through a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run<'a, V> {
    pub node: NodeHandle,
    pub color: Color,
    /// Index of the run's first element under the view.
    pub start: usize,
    /// Index just past the run under the view.
    pub end: usize,
    pub value: &'a V,
}

/// Values of the elements visible in a view, one per element.
#[derive(Clone, Debug)]
pub struct Elements<'a, V> {
    cursor: TreeIterator<'a, V>,
    view: ColorSet,
}

impl<'a, V> Iterator for Elements<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.cursor.next(self.view)?;
        return self.cursor.value();
    }
}

/// The runs visible in a view.
#[derive(Clone, Debug)]
pub struct Runs<'a, V> {
    cursor: TreeIterator<'a, V>,
    view: ColorSet,
}

impl<'a, V> Iterator for Runs<'a, V> {
    type Item = Run<'a, V>;

    fn next(&mut self) -> Option<Run<'a, V>> {
        let node = self.cursor.next_node(self.view)?;
        return Some(Run {
            node,
            color: self.cursor.color()?,
            start: self.cursor.node_start_index(self.view),
            end: self.cursor.node_end_index(self.view),
            value: self.cursor.value()?,
        });
    }
}

impl<V> ColorTree<V> {
    pub fn cursor(&self) -> TreeIterator<'_, V> {
        return TreeIterator::new(self);
    }

    /// Values of the elements visible in `view`, in order.
    pub fn iter(&self, view: ColorSet) -> Elements<'_, V> {
        return Elements { cursor: TreeIterator::new(self), view };
    }

    /// Runs visible in `view`, in order.
    pub fn runs(&self, view: ColorSet) -> Runs<'_, V> {
        return Runs { cursor: TreeIterator::new(self), view };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorCoder;

    /// Builds "AABBBAAC" with one value per run.
    fn tree() -> (ColorTree<char>, Color, Color, Color, ColorSet) {
        let coder = ColorCoder::new(["A", "B", "C"]).unwrap();
        let a = coder.color_to_byte("A").unwrap();
        let b = coder.color_to_byte("B").unwrap();
        let c = coder.color_to_byte("C").unwrap();
        let all = coder.all();
        let mut tree = ColorTree::new(coder);
        tree.add(0, all, a, 'p', 2).unwrap();
        tree.add(2, all, b, 'q', 3).unwrap();
        tree.add(5, all, a, 'r', 2).unwrap();
        tree.add(7, all, c, 's', 1).unwrap();
        return (tree, a, b, c, all);
    }

    #[test]
    fn steps_through_view() {
        let (tree, a, _, _, all) = tree();
        let mut cursor = tree.cursor();
        let mut seen = Vec::new();
        while cursor.next(a.into()).is_some() {
            seen.push((cursor.index(a.into()), cursor.index(all), *cursor.value().unwrap()));
        }
        assert_eq!(seen, vec![(0, 0, 'p'), (1, 1, 'p'), (2, 5, 'r'), (3, 6, 'r')]);
        assert!(!cursor.has_next(a.into()));
        assert!(cursor.has_next(all));
    }

    #[test]
    fn steps_by_run() {
        let (tree, a, b, _, all) = tree();
        let runs: Vec<(usize, usize)> = tree.runs(a | b).map(|run| (run.start, run.end)).collect();
        assert_eq!(runs, vec![(0, 2), (2, 5), (5, 7)]);

        let mut cursor = tree.cursor();
        assert_eq!(cursor.next_node(b.into()), tree.get(2, all).ok());
        assert_eq!(cursor.node_start_index(b.into()), 0);
        assert_eq!(cursor.node_end_index(b.into()), 3);
        assert_eq!(cursor.node_start_index(all), 2);
        assert!(!cursor.has_next_node(b.into()));
        assert_eq!(cursor.next_node(b.into()), None);
    }

    #[test]
    fn mixes_element_and_run_steps() {
        let (tree, _, _, _, all) = tree();
        let mut cursor = tree.cursor();
        cursor.next(all);
        cursor.next(all);
        assert_eq!(cursor.index(all), 1);
        cursor.next_node(all);
        assert_eq!(cursor.index(all), 2);
        assert_eq!(cursor.value(), Some(&'q'));
        cursor.next(all);
        assert_eq!(cursor.index(all), 3);
    }

    #[test]
    fn starts_mid_tree() {
        let (tree, a, b, c, all) = tree();
        let mut cursor = TreeIterator::starting_at(&tree, 4, all).unwrap();
        assert_eq!(cursor.index(all), 3);
        assert_eq!(cursor.index(b.into()), 1);
        assert_eq!(cursor.index(a.into()), 2);
        assert_eq!(cursor.next(all), tree.get(4, all).ok());
        assert_eq!(cursor.index(all), 4);
        assert_eq!(cursor.next(c.into()), tree.get(7, all).ok());
        assert_eq!(cursor.index(all), 7);
        assert!(!cursor.has_next(all));

        let fresh = TreeIterator::starting_at(&tree, 0, all).unwrap();
        assert!(fresh.node().is_none());
        assert!(TreeIterator::starting_at(&tree, 9, all).is_err());
    }

    #[test]
    fn elements_match_view() {
        let (tree, a, _, c, all) = tree();
        let values: String = tree.iter(a | c).collect();
        assert_eq!(values, "pprrs");
        assert_eq!(tree.iter(all).count(), 8);
    }

    #[test]
    fn empty_tree_has_nothing() {
        let coder = ColorCoder::new(["A"]).unwrap();
        let all = coder.all();
        let tree: ColorTree<u8> = ColorTree::new(coder);
        let mut cursor = tree.cursor();
        assert!(!cursor.has_next(all));
        assert!(!cursor.has_next_node(all));
        assert_eq!(cursor.next(all), None);
        assert_eq!(tree.runs(all).count(), 0);
    }
}
