//! Merging several documents of one format into one graph.
//!
//! Nodes are unified by [`crate::matching::resolver_key`]; edges are
//! translated to the surviving ids. When the inputs have more than one
//! distinct root, a synthetic root describes all of them. Merging a merged
//! document unwraps its synthetic root first, so wrapping never nests.

mod engine;

pub use engine::{GraphMerger, DEFAULT_SYNTHETIC_ROOT_NAME};
