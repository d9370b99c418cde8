//! Adjacency build: nested leaf-range traversal with an AABB touch test.
//!
//! # Algorithm
//!
//! 1. Enumerate every leaf inside the octree's metric bounds.
//! 2. For each leaf, query the leaves inside a window of one tree resolution
//!    around its center.
//! 3. Keep the candidates whose box touches the leaf's box on all three axes,
//!    within `epsilon`.
//!
//! The window margin is the tree's finest resolution, not the size of the
//! current leaf. A coarse leaf therefore only discovers neighbors whose boxes
//! reach into that window, while small neighbors further out still list the
//! coarse leaf from their own side. Adjacency between mixed sizes is thus
//! only symmetric when both window queries see each other.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec3;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, info};
use web_time::Instant;

use super::{AdjacencyConfig, AdjacencyMap, NodeInfo};
use crate::error::{BuildError, OctreeError};
use crate::octree::{LeafCell, LeafSource};

/// Check if two cells touch or overlap along every axis.
///
/// Cells count as touching when, on each axis, the distance between their
/// centers exceeds the sum of their half sizes by at most `epsilon`.
#[inline]
pub fn touches(a: &LeafCell, b: &LeafCell, epsilon: f64) -> bool {
	let combined = a.size / 2.0 + b.size / 2.0;
	let d = (a.center - b.center).abs();
	d.x - combined <= epsilon && d.y - combined <= epsilon && d.z - combined <= epsilon
}

/// Builds [`AdjacencyMap`]s from any [`LeafSource`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AdjacencyBuilder<'a> {
	config: AdjacencyConfig,
	cancel: Option<&'a AtomicBool>,
}

impl<'a> AdjacencyBuilder<'a> {
	pub fn new(config: AdjacencyConfig) -> Self {
		Self {
			config,
			cancel: None,
		}
	}

	/// Abort the build with [`BuildError::Cancelled`] once `flag` is set.
	///
	/// The flag is checked before each outer leaf, so a build stops within one
	/// neighbor query of the request.
	pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
		self.cancel = Some(flag);
		self
	}

	#[inline]
	fn check_cancelled(&self) -> Result<(), BuildError> {
		match self.cancel {
			Some(flag) if flag.load(Ordering::Relaxed) => Err(BuildError::Cancelled),
			_ => Ok(()),
		}
	}

	/// Candidates around `leaf` that touch it, excluding the leaf itself.
	fn touching<O: LeafSource>(
		&self,
		octree: &O,
		leaf: &LeafCell,
		margin: DVec3,
	) -> Result<SmallVec<[LeafCell; 8]>, OctreeError> {
		let candidates = octree.leaf_range(
			leaf.center - margin,
			leaf.center + margin,
			self.config.max_depth,
		)?;
		Ok(
			candidates
				.filter(|c| c.key != leaf.key && touches(leaf, c, self.config.epsilon))
				.collect(),
		)
	}

	fn record_leaf(map: &mut AdjacencyMap, leaf: &LeafCell, neighbors: &[LeafCell]) {
		let id = map.keys.get_or_insert(leaf.key);
		map.nodes_info.record(
			id,
			NodeInfo {
				size: leaf.size,
				center: leaf.center,
			},
		);
		for neighbor in neighbors {
			let nid = map.keys.get_or_insert(neighbor.key);
			map.push_neighbor(id, nid);
		}
	}

	/// Build the adjacency map of `octree` on the calling thread.
	#[tracing::instrument(skip_all, name = "adjacency::build")]
	pub fn build<O: LeafSource>(&self, octree: &O) -> Result<AdjacencyMap, BuildError> {
		let start = Instant::now();
		let resolution = octree.resolution();
		let bounds = octree.metric_bounds();
		let margin = DVec3::splat(resolution);
		debug!(resolution, min = %bounds.min, max = %bounds.max, "starting adjacency build");

		let mut map = AdjacencyMap::default();
		for leaf in octree.leaf_range(bounds.min, bounds.max, self.config.max_depth)? {
			self.check_cancelled()?;
			let neighbors = self.touching(octree, &leaf, margin)?;
			Self::record_leaf(&mut map, &leaf, &neighbors);
		}

		log_summary(&map, start);
		Ok(map)
	}

	/// Build the adjacency map of `octree` on the rayon thread pool.
	///
	/// Neighbor queries run in parallel; results are merged in leaf order, so
	/// the map equals the one [`AdjacencyBuilder::build`] returns.
	#[tracing::instrument(skip_all, name = "adjacency::build_parallel")]
	pub fn build_parallel<O: LeafSource + Sync>(
		&self,
		octree: &O,
	) -> Result<AdjacencyMap, BuildError> {
		let start = Instant::now();
		let resolution = octree.resolution();
		let bounds = octree.metric_bounds();
		let margin = DVec3::splat(resolution);
		debug!(resolution, min = %bounds.min, max = %bounds.max, "starting parallel adjacency build");

		let leaves: Vec<LeafCell> = {
			let _span = tracing::info_span!("collect_leaves").entered();
			octree
				.leaf_range(bounds.min, bounds.max, self.config.max_depth)?
				.collect()
		};

		let found: Vec<SmallVec<[LeafCell; 8]>> = {
			let _span = tracing::info_span!("neighbor_queries").entered();
			leaves
				.par_iter()
				.map(|leaf| -> Result<_, BuildError> {
					self.check_cancelled()?;
					Ok(self.touching(octree, leaf, margin)?)
				})
				.collect::<Result<_, BuildError>>()?
		};

		let mut map = AdjacencyMap::default();
		{
			let _span = tracing::info_span!("merge").entered();
			for (leaf, neighbors) in leaves.iter().zip(&found) {
				Self::record_leaf(&mut map, leaf, neighbors);
			}
		}

		log_summary(&map, start);
		Ok(map)
	}
}

fn log_summary(map: &AdjacencyMap, start: Instant) {
	info!(
		leaves = map.node_count(),
		keys = map.key_count(),
		edges = map.edge_count(),
		elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
		"adjacency map built"
	);
}

impl AdjacencyMap {
	/// Build with the default configuration.
	pub fn build<O: LeafSource>(octree: &O) -> Result<Self, BuildError> {
		AdjacencyBuilder::default().build(octree)
	}
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
