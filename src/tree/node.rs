//! Arena nodes and the handles that name them.

use crate::color::{Color, MAX_COLORS};

/// Index into the node arena.
pub(crate) type NodeIdx = u32;

/// Sentinel for a missing parent or child.
pub(crate) const NONE: NodeIdx = u32::MAX;

/// Opaque, stable reference to a run in a [`ColorTree`].
///
/// Handles survive every structural change that does not remove their own
/// node. Once the node is removed the handle goes stale, and the tree rejects
/// it even if the arena slot has been reused since.
///
/// [`ColorTree`]: super::ColorTree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) index: NodeIdx,
    pub(crate) generation: u32,
}

/// A run of `len` contiguous elements sharing one color and one value.
#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    /// `None` while the slot sits on the free list.
    pub(crate) value: Option<V>,
    pub(crate) color: Color,
    pub(crate) len: usize,
    /// Elements of each color in the subtree rooted here, this run included.
    pub(crate) counts: [usize; MAX_COLORS],
    /// Height of the subtree rooted here; a leaf has height 1.
    pub(crate) height: u8,
    /// Whether sorted insertion may compare against this run.
    pub(crate) sorted: bool,
    pub(crate) parent: NodeIdx,
    pub(crate) left: NodeIdx,
    pub(crate) right: NodeIdx,
    /// Bumped every time the slot is freed.
    pub(crate) generation: u32,
}

impl<V> Node<V> {
    pub(crate) fn new(color: Color, len: usize, value: V, parent: NodeIdx) -> Node<V> {
        let mut counts = [0; MAX_COLORS];
        counts[color.index()] = len;
        return Node {
            value: Some(value),
            color,
            len,
            counts,
            height: 1,
            sorted: true,
            parent,
            left: NONE,
            right: NONE,
            generation: 0,
        };
    }

    /// Reinitializes a free slot, keeping its generation.
    pub(crate) fn reuse(&mut self, color: Color, len: usize, value: V, parent: NodeIdx) {
        let generation = self.generation;
        *self = Node::new(color, len, value, parent);
        self.generation = generation;
    }

    #[inline(always)]
    pub(crate) fn is_live(&self) -> bool {
        return self.value.is_some();
    }
}
