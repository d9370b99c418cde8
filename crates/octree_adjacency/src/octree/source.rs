//! Interface an octree must provide for adjacency builds.

use std::path::Path;

use glam::DVec3;

use super::{DAabb3, SpatialKey};
use crate::error::OctreeError;

/// A leaf cell reported by a range query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeafCell {
	/// Key of the cell at its own depth.
	pub key: SpatialKey,
	/// Center of the cell in world units.
	pub center: DVec3,
	/// Edge length of the cell.
	pub size: f64,
}

impl LeafCell {
	/// World-space box of the cell.
	#[inline]
	pub fn aabb(&self) -> DAabb3 {
		DAabb3::from_cell(self.center, self.size)
	}
}

/// Read-only geometric view of an octree.
///
/// Range queries take `&self`; an implementation must not need exclusive
/// access to iterate, and the tree must not change while an adjacency build
/// borrows it.
pub trait LeafSource {
	/// Iterator returned by [`LeafSource::leaf_range`].
	type Leaves<'a>: Iterator<Item = LeafCell>
	where
		Self: 'a;

	/// Edge length of the finest cells.
	fn resolution(&self) -> f64;

	/// Box enclosing every leaf. Empty trees report [`DAabb3::EMPTY`].
	fn metric_bounds(&self) -> DAabb3;

	/// All leaves intersecting the box `[min, max]`.
	///
	/// `max_depth = 0` means unconstrained; otherwise leaves deeper than
	/// `max_depth` are reported once, as their ancestor at `max_depth`.
	fn leaf_range(
		&self,
		min: DVec3,
		max: DVec3,
		max_depth: u8,
	) -> Result<Self::Leaves<'_>, OctreeError>;
}

/// An octree that can be reacquired from the file it was stored in.
pub trait OctreeStore: LeafSource + Sized {
	/// Load the octree stored at `path`.
	fn load(path: &Path) -> Result<Self, OctreeError>;

	/// File this octree was loaded from or last written to.
	fn path(&self) -> Option<&Path>;
}
