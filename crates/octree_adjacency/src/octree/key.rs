//! SpatialKey - immutable value type addressing a cell of the octree.
//!
//! Keys use the octomap convention: each axis is a `u16` index into the
//! finest-depth grid, offset so that key `2^(tree_depth - 1)` holds the cell
//! whose minimum corner is the origin. A cell at a coarser depth is
//! identified by its depth-adjusted key (see [`OctreeConfig::adjust_key`]).
//!
//! [`OctreeConfig::adjust_key`]: super::OctreeConfig::adjust_key

use std::fmt;

/// Octree cell key - immutable value type.
///
/// Equality and hashing are component-wise, so two keys built from the same
/// coordinates are interchangeable as map keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct SpatialKey {
	/// Key along X
	pub x: u16,
	/// Key along Y
	pub y: u16,
	/// Key along Z
	pub z: u16,
}

impl SpatialKey {
	/// Create a new key from its three components.
	pub const fn new(x: u16, y: u16, z: u16) -> Self {
		Self { x, y, z }
	}

	/// Components as an array, X first.
	#[inline]
	pub fn to_array(self) -> [u16; 3] {
		[self.x, self.y, self.z]
	}

	/// Build a key from an array, X first.
	#[inline]
	pub fn from_array(k: [u16; 3]) -> Self {
		Self::new(k[0], k[1], k[2])
	}
}

impl From<[u16; 3]> for SpatialKey {
	fn from(k: [u16; 3]) -> Self {
		Self::from_array(k)
	}
}

impl fmt::Display for SpatialKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {}, {})", self.x, self.y, self.z)
	}
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
