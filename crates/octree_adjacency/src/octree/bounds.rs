//! Metric boxes for cells, octree bounds and range-query windows.

use glam::DVec3;

/// Closed axis-aligned box in world units.
///
/// Both corners belong to the box, so cells sharing a face overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	pub min: DVec3,
	pub max: DVec3,
}

impl DAabb3 {
	/// Degenerate box at the origin, reported by empty octrees.
	pub const EMPTY: Self = Self {
		min: DVec3::ZERO,
		max: DVec3::ZERO,
	};

	/// Box of a cubic cell with edge length `size`.
	#[inline]
	pub fn from_cell(center: DVec3, size: f64) -> Self {
		let half = DVec3::splat(size * 0.5);
		Self {
			min: center - half,
			max: center + half,
		}
	}

	/// Smallest box containing both boxes.
	#[inline]
	pub fn union(&self, other: &DAabb3) -> DAabb3 {
		Self {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}
}
