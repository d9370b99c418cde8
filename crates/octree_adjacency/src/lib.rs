//! octree_adjacency - Leaf adjacency graphs for sparse occupancy octrees
//!
//! This crate computes, for every leaf cell of an octree, the other leaf
//! cells whose boxes touch or overlap it, across cells of different sizes.
//! The resulting graph is meant for planners and graph searches that need
//! cell-to-cell connectivity without going back to the tree geometry.
//!
//! # Features
//!
//! - **Adjacency Builder**: nested range-query traversal with a
//!   tolerance-based box touch test, sequential or on the rayon pool
//! - **Canonical Keys**: every key is interned once and addressed by a dense
//!   `NodeId`
//! - **Persistence**: checksummed binary files that rebind to the octree by
//!   path on load
//! - **LeafOctree**: a small map-of-leaves octree implementing the
//!   interface the builder consumes
//!
//! # Example
//!
//! ```ignore
//! use glam::DVec3;
//! use octree_adjacency::{octree::LeafOctree, AdjacencyMap};
//!
//! let mut tree = LeafOctree::new(0.1)?;
//! tree.insert(DVec3::new(0.05, 0.05, 0.05), 16)?;
//! tree.insert(DVec3::new(0.15, 0.05, 0.05), 16)?;
//! tree.write("scan.oct")?;
//!
//! let map = AdjacencyMap::build(&tree)?;
//! map.write(&tree, "scan.adj")?;
//!
//! let (map, tree): (AdjacencyMap, LeafOctree) = AdjacencyMap::read("scan.adj")?;
//! ```

pub mod codec;
pub mod error;

// Octree collaborator consumed by the builder
pub mod octree;

// Adjacency graph and its builder
pub mod adjacency;
pub use adjacency::{
	touches, AdjacencyBuilder, AdjacencyConfig, AdjacencyMap, NodeId, NodeInfo, EPSILON,
};

// Binary persistence
pub mod persist;
pub use persist::{load, save};

pub use error::{BuildError, DecodeError, OctreeError, PersistError};

#[cfg(test)]
mod test_utils;
