//! Glazier - the indexed-collection core beneath a reactive list library.
//!
//! Two structures do the heavy lifting for list operators such as filters and
//! sorts:
//!
//! - [`ColorTree`]: one physical sequence viewed as several overlapping lists.
//!   Every element carries a color and positions are measured within a view,
//!   a set of colors, so a filter can keep its source and filtered indices in
//!   one tree and translate between them in O(log n).
//! - [`ChangeBlockSequence`]: folds the per-element edits an operator makes
//!   during one transaction into the fewest contiguous blocks, replayable by
//!   element or by block.
//!
//! # Quick Start
//!
//! ```
//! use glazier::{ChangeBlockSequence, ColorCoder, ColorTree};
//!
//! let coder = ColorCoder::new(["kept", "dropped"]).unwrap();
//! let kept = coder.color_to_byte("kept").unwrap();
//! let dropped = coder.color_to_byte("dropped").unwrap();
//! let all = coder.all();
//!
//! // a filter over ["ant", "bee", "cat"] that drops "bee"
//! let mut tree = ColorTree::new(coder);
//! tree.add(0, all, kept, "ant", 1).unwrap();
//! tree.add(1, all, dropped, "bee", 1).unwrap();
//! tree.add(2, all, kept, "cat", 1).unwrap();
//! assert_eq!(tree.size(kept.into()), 2);
//! assert_eq!(tree.convert_index_color(2, all, kept.into()), Ok(1));
//!
//! // "bee" now passes the filter and appears at filtered index 1
//! let bee = tree.get(1, all).unwrap();
//! tree.set_color(bee, kept).unwrap();
//! let mut changes = ChangeBlockSequence::new();
//! assert!(changes.insert(1, 2));
//! assert_eq!(changes.to_string(), "I[1,2)");
//! ```
//!
//! None of these types lock. Callers serialize mutation behind their own
//! reader-writer lock; queries take `&self` and may run concurrently.

pub mod change;
pub mod color;
pub mod error;
pub mod tree;

pub use change::{Block, Change, ChangeBlockSequence, ChangeIterator, ChangeType};
pub use color::{Color, ColorCoder, ColorSet, MAX_COLORS};
pub use error::{Error, Result};
pub use tree::{ColorTree, Lookup, NodeHandle, TreeIterator, ValueBias};
