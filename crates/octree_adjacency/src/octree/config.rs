//! OctreeConfig - key and coordinate math for a fixed-depth octree.
//!
//! Depth 1 holds the eight children of the root, `tree_depth` is the finest
//! level. Depth 0 (the root) is never a leaf.

use glam::DVec3;

use super::SpatialKey;
use crate::error::OctreeError;

/// Default tree depth, matching 16-bit keys.
pub const DEFAULT_TREE_DEPTH: u8 = 16;

/// Inclusive range of finest-depth keys covered by a cell, per axis.
///
/// Stored as `i32` so spans can be compared against unclamped query boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySpan {
	pub min: [i32; 3],
	pub max: [i32; 3],
}

impl KeySpan {
	/// Check if two spans share at least one finest-depth key.
	#[inline]
	pub fn overlaps(&self, other: &KeySpan) -> bool {
		(0..3).all(|a| self.min[a] <= other.max[a] && self.max[a] >= other.min[a])
	}
}

/// Resolution and depth of an octree, plus the key math derived from them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeConfig {
	/// Edge length of a finest-depth cell in world units.
	pub resolution: f64,
	/// Number of levels below the root (1..=16).
	pub tree_depth: u8,
}

impl OctreeConfig {
	/// Create a validated configuration.
	pub fn new(resolution: f64, tree_depth: u8) -> Result<Self, OctreeError> {
		if !(resolution.is_finite() && resolution > 0.0) {
			return Err(OctreeError::InvalidResolution(resolution));
		}
		if tree_depth == 0 || tree_depth > DEFAULT_TREE_DEPTH {
			return Err(OctreeError::InvalidDepth {
				depth: tree_depth,
				tree_depth: DEFAULT_TREE_DEPTH,
			});
		}
		Ok(Self {
			resolution,
			tree_depth,
		})
	}

	/// Key of the finest cell whose minimum corner is the origin.
	#[inline]
	pub fn max_key_val(&self) -> i32 {
		1 << (self.tree_depth - 1)
	}

	/// Number of finest-depth keys per axis.
	#[inline]
	pub fn keys_per_axis(&self) -> i32 {
		1 << self.tree_depth
	}

	/// Check that `depth` can hold a leaf.
	pub fn check_depth(&self, depth: u8) -> Result<(), OctreeError> {
		if depth == 0 || depth > self.tree_depth {
			return Err(OctreeError::InvalidDepth {
				depth,
				tree_depth: self.tree_depth,
			});
		}
		Ok(())
	}

	/// Edge length of a cell at `depth`.
	/// node_size = resolution * 2^(tree_depth - depth)
	#[inline]
	pub fn get_node_size(&self, depth: u8) -> f64 {
		debug_assert!(depth <= self.tree_depth);
		self.resolution * (1u64 << (self.tree_depth - depth)) as f64
	}

	#[inline]
	fn coord_to_key_unchecked(&self, coordinate: f64) -> i64 {
		// Clamp before casting so huge or infinite coordinates land just outside
		// the key space instead of overflowing the offset.
		let span = self.keys_per_axis() as f64;
		let scaled = (coordinate / self.resolution).floor().clamp(-span, span);
		scaled as i64 + self.max_key_val() as i64
	}

	/// Finest-depth key of the cell containing `coord`, or `None` outside the
	/// addressable space.
	pub fn coord_to_key(&self, coord: DVec3) -> Option<SpatialKey> {
		if !coord.is_finite() {
			return None;
		}
		let limit = self.keys_per_axis() as i64;
		let mut out = [0u16; 3];
		for (axis, slot) in out.iter_mut().enumerate() {
			let k = self.coord_to_key_unchecked(coord[axis]);
			if !(0..limit).contains(&k) {
				return None;
			}
			*slot = k as u16;
		}
		Some(SpatialKey::from_array(out))
	}

	/// Finest-depth key of `coord`, clamped into the addressable space.
	pub fn coord_to_key_clamped(&self, coord: DVec3) -> [i32; 3] {
		let upper = self.keys_per_axis() as i64 - 1;
		let mut out = [0i32; 3];
		for (axis, slot) in out.iter_mut().enumerate() {
			*slot = self.coord_to_key_unchecked(coord[axis]).clamp(0, upper) as i32;
		}
		out
	}

	/// Adjust a key to identify the cell containing it at `depth`.
	///
	/// The adjusted key sits in the middle of the cell's finest-depth span.
	pub fn adjust_key(&self, key: SpatialKey, depth: u8) -> SpatialKey {
		debug_assert!(depth >= 1 && depth <= self.tree_depth);
		let diff = (self.tree_depth - depth) as u32;
		if diff == 0 {
			return key;
		}
		let mv = self.max_key_val();
		let adjust = |k: u16| -> u16 {
			((((k as i32 - mv) >> diff) << diff) + (1 << (diff - 1)) + mv) as u16
		};
		SpatialKey::new(adjust(key.x), adjust(key.y), adjust(key.z))
	}

	/// Center of the cell identified by `key` at `depth`.
	pub fn key_to_coord(&self, key: SpatialKey, depth: u8) -> DVec3 {
		let diff = (self.tree_depth - depth) as u32;
		let mv = self.max_key_val();
		let node_size = self.get_node_size(depth);
		let axis = |k: u16| -> f64 { (((k as i32 - mv) >> diff) as f64 + 0.5) * node_size };
		DVec3::new(axis(key.x), axis(key.y), axis(key.z))
	}

	/// Inclusive finest-depth key span of the cell `key` at `depth`.
	pub fn key_span(&self, key: SpatialKey, depth: u8) -> KeySpan {
		let diff = (self.tree_depth - depth) as u32;
		let mv = self.max_key_val();
		let k = key.to_array();
		let mut span = KeySpan {
			min: [0; 3],
			max: [0; 3],
		};
		for axis in 0..3 {
			let lo = (((k[axis] as i32 - mv) >> diff) << diff) + mv;
			span.min[axis] = lo;
			span.max[axis] = lo + (1 << diff) - 1;
		}
		span
	}
}

impl Default for OctreeConfig {
	fn default() -> Self {
		Self {
			resolution: 0.1,
			tree_depth: DEFAULT_TREE_DEPTH,
		}
	}
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
