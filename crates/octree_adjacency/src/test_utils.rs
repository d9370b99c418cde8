//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use glam::DVec3;

use crate::error::OctreeError;
use crate::octree::{DAabb3, LeafCell, LeafOctree, LeafSource, SpatialKey};

// =============================================================================
// CellList - leaf source over explicit cells
// =============================================================================

/// Leaf source answering range queries by brute-force box overlap.
///
/// Cells can be placed anywhere, which makes it possible to build layouts a
/// real octree cannot represent. `max_depth` is ignored.
pub struct CellList {
	pub resolution: f64,
	pub cells: Vec<LeafCell>,
}

impl CellList {
	pub fn new(resolution: f64) -> Self {
		Self {
			resolution,
			cells: Vec::new(),
		}
	}

	/// Add a cell keyed by its insertion index.
	pub fn with_cell(mut self, center: DVec3, size: f64) -> Self {
		let key = SpatialKey::new(self.cells.len() as u16, 0, 0);
		self.cells.push(LeafCell { key, center, size });
		self
	}

	pub fn key(&self, index: usize) -> SpatialKey {
		self.cells[index].key
	}
}

impl LeafSource for CellList {
	type Leaves<'a>
		= std::vec::IntoIter<LeafCell>
	where
		Self: 'a;

	fn resolution(&self) -> f64 {
		self.resolution
	}

	fn metric_bounds(&self) -> DAabb3 {
		self
			.cells
			.iter()
			.map(LeafCell::aabb)
			.reduce(|a, b| a.union(&b))
			.unwrap_or(DAabb3::EMPTY)
	}

	fn leaf_range(
		&self,
		min: DVec3,
		max: DVec3,
		_max_depth: u8,
	) -> Result<Self::Leaves<'_>, OctreeError> {
		let (lo, hi) = (min.min(max), min.max(max));
		let hits: Vec<LeafCell> = self
			.cells
			.iter()
			.filter(|c| {
				let b = c.aabb();
				b.min.cmple(hi).all() && lo.cmple(b.max).all()
			})
			.copied()
			.collect();
		Ok(hits.into_iter())
	}
}

// =============================================================================
// BrokenSource - fails after a number of queries
// =============================================================================

/// Wraps a source and fails every range query after the first `healthy`.
pub struct BrokenSource<S> {
	pub inner: S,
	pub healthy: usize,
	queries: AtomicUsize,
}

impl<S> BrokenSource<S> {
	pub fn new(inner: S, healthy: usize) -> Self {
		Self {
			inner,
			healthy,
			queries: AtomicUsize::new(0),
		}
	}
}

impl<S: LeafSource> LeafSource for BrokenSource<S> {
	type Leaves<'a>
		= S::Leaves<'a>
	where
		Self: 'a;

	fn resolution(&self) -> f64 {
		self.inner.resolution()
	}

	fn metric_bounds(&self) -> DAabb3 {
		self.inner.metric_bounds()
	}

	fn leaf_range(
		&self,
		min: DVec3,
		max: DVec3,
		max_depth: u8,
	) -> Result<Self::Leaves<'_>, OctreeError> {
		if self.queries.fetch_add(1, Ordering::Relaxed) >= self.healthy {
			return Err(OctreeError::Io(std::io::Error::other("octree backend went away")));
		}
		self.inner.leaf_range(min, max, max_depth)
	}
}

// =============================================================================
// Octree fixtures
// =============================================================================

/// Unit-resolution octree with a 4x4x4 block of finest cells over
/// `[0, 4)^3` and a 2x2x2 block of depth-15 cells over
/// `[4, 8) x [0, 4) x [0, 4)`.
pub fn mixed_depth_octree() -> LeafOctree {
	let mut tree = LeafOctree::new(1.0).unwrap();
	for x in 0..4 {
		for y in 0..4 {
			for z in 0..4 {
				let p = DVec3::new(x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5);
				tree.insert(p, 16).unwrap();
			}
		}
	}
	for x in [5.0, 7.0] {
		for y in [1.0, 3.0] {
			for z in [1.0, 3.0] {
				tree.insert(DVec3::new(x, y, z), 15).unwrap();
			}
		}
	}
	tree
}

/// Key of the leaf containing `p` in `tree`.
pub fn key_at(tree: &LeafOctree, p: DVec3) -> SpatialKey {
	tree
		.leaves()
		.find(|c| {
			let b = c.aabb();
			b.min.cmple(p).all() && p.cmple(b.max).all()
		})
		.map(|c| c.key)
		.unwrap_or_else(|| panic!("no leaf contains {p}"))
}
