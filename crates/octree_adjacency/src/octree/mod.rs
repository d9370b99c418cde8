//! Sparse octree collaborator for adjacency builds.
//!
//! The adjacency builder only sees octrees through the [`LeafSource`] and
//! [`OctreeStore`] traits. [`LeafOctree`] is the implementation shipped with
//! this crate: an implicit tree where leaves are the only stored state.
//!
//! # Depth Convention
//!
//! Depth 0 = root, `tree_depth` (16 by default) = finest cells.
//!
//! ```text
//! Node Size = resolution * 2^(tree_depth - depth)
//! ```
//!
//! # Module Structure
//!
//! - [`key`]: `SpatialKey` - immutable value type for cell keys
//! - [`config`]: `OctreeConfig` - key/coordinate math
//! - [`bounds`]: `DAabb3` - metric boxes
//! - [`source`]: `LeafSource`, `OctreeStore` - the interface the builder needs
//! - [`leaves`]: `LeafOctree` - map-of-leaves implementation with file I/O

pub mod bounds;
pub mod config;
pub mod key;
pub mod leaves;
pub mod source;

// Re-exports
pub use bounds::DAabb3;
pub use config::{KeySpan, OctreeConfig, DEFAULT_TREE_DEPTH};
pub use key::SpatialKey;
pub use leaves::LeafOctree;
pub use source::{LeafCell, LeafSource, OctreeStore};
