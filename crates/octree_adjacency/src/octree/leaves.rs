//! LeafOctree - sparse octree represented as a map of leaf cells.
//!
//! The tree structure is implicit: parent/child relationships are computed
//! on demand via key math. Only leaves are stored, keyed by their
//! depth-adjusted [`SpatialKey`]. Leaves never overlap; inserting a leaf
//! displaces any ancestor or descendant leaf it overlaps.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use tracing::debug;

use super::{DAabb3, KeySpan, LeafCell, LeafSource, OctreeConfig, OctreeStore, SpatialKey};
use crate::codec::{DecodeError, Decoder, Encoder};
use crate::error::{OctreeError, OctreeResult};

const FILE_MAGIC: &[u8; 8] = b"OCTLEAF\0";
const FILE_VERSION: u16 = 1;

/// Sparse octree - leaves ARE the state.
#[derive(Clone, Debug)]
pub struct LeafOctree {
	config: OctreeConfig,
	/// Depth-adjusted key -> leaf depth.
	leaves: HashMap<SpatialKey, u8>,
	/// Number of leaves per depth, used to skip descendant scans.
	depth_counts: [usize; 17],
	path: Option<PathBuf>,
}

impl LeafOctree {
	/// Create an empty octree with 16 levels.
	pub fn new(resolution: f64) -> OctreeResult<Self> {
		Self::with_depth(resolution, super::DEFAULT_TREE_DEPTH)
	}

	/// Create an empty octree with an explicit tree depth.
	pub fn with_depth(resolution: f64, tree_depth: u8) -> OctreeResult<Self> {
		Ok(Self::from_config(OctreeConfig::new(resolution, tree_depth)?))
	}

	fn from_config(config: OctreeConfig) -> Self {
		Self {
			config,
			leaves: HashMap::new(),
			depth_counts: [0; 17],
			path: None,
		}
	}

	/// Key math for this tree.
	pub fn config(&self) -> &OctreeConfig {
		&self.config
	}

	/// Number of leaves.
	pub fn len(&self) -> usize {
		self.leaves.len()
	}

	/// Check if empty.
	pub fn is_empty(&self) -> bool {
		self.leaves.is_empty()
	}

	/// Depth of the leaf stored under `key`, if any.
	pub fn depth_of(&self, key: &SpatialKey) -> Option<u8> {
		self.leaves.get(key).copied()
	}

	/// Check if `key` identifies a leaf.
	pub fn contains(&self, key: &SpatialKey) -> bool {
		self.leaves.contains_key(key)
	}

	/// Insert the leaf at `depth` containing `coord`, returning its key.
	pub fn insert(&mut self, coord: DVec3, depth: u8) -> OctreeResult<SpatialKey> {
		self.config.check_depth(depth)?;
		let key = self
			.config
			.coord_to_key(coord)
			.ok_or(OctreeError::OutOfBounds {
				x: coord.x,
				y: coord.y,
				z: coord.z,
			})?;
		let key = self.config.adjust_key(key, depth);
		self.place(key, depth);
		Ok(key)
	}

	/// Insert the leaf at `depth` containing `key`.
	///
	/// Returns the number of overlapping leaves that were displaced.
	pub fn insert_key(&mut self, key: SpatialKey, depth: u8) -> OctreeResult<usize> {
		self.config.check_depth(depth)?;
		Ok(self.place(self.config.adjust_key(key, depth), depth))
	}

	/// Remove the leaf stored under `key`.
	pub fn remove(&mut self, key: &SpatialKey) -> bool {
		match self.leaves.remove(key) {
			Some(depth) => {
				self.depth_counts[depth as usize] -= 1;
				true
			}
			None => false,
		}
	}

	/// Iterate over all leaves in unspecified order.
	pub fn leaves(&self) -> impl Iterator<Item = LeafCell> + '_ {
		self.leaves.iter().map(|(&key, &depth)| self.cell(key, depth))
	}

	fn cell(&self, key: SpatialKey, depth: u8) -> LeafCell {
		LeafCell {
			key,
			center: self.config.key_to_coord(key, depth),
			size: self.config.get_node_size(depth),
		}
	}

	/// Store an already adjusted key, displacing overlapping leaves.
	fn place(&mut self, key: SpatialKey, depth: u8) -> usize {
		if self.leaves.get(&key) == Some(&depth) {
			return 0;
		}
		let mut displaced = 0;

		// Ancestors sit exactly at the adjusted key of each shallower depth.
		for d in 1..depth {
			let ancestor = self.config.adjust_key(key, d);
			if self.leaves.get(&ancestor) == Some(&d) {
				self.remove(&ancestor);
				displaced += 1;
			}
		}

		let finer = (depth as usize + 1)..=(self.config.tree_depth as usize);
		if self.depth_counts[finer].iter().any(|&n| n > 0) {
			let span = self.config.key_span(key, depth);
			let config = self.config;
			let inside: Vec<SpatialKey> = self
				.leaves
				.iter()
				.filter(|(&k, &d)| d > depth && config.key_span(k, d).overlaps(&span))
				.map(|(&k, _)| k)
				.collect();
			for k in &inside {
				self.remove(k);
			}
			displaced += inside.len();
		}

		self.leaves.insert(key, depth);
		self.depth_counts[depth as usize] += 1;
		displaced
	}

	/// Hash lookups needed to visit every candidate node of `query`, capped
	/// at `limit`.
	fn lookup_cost(&self, query: &KeySpan, limit: usize) -> usize {
		let mv = self.config.max_key_val();
		let mut total = 0usize;
		for depth in 1..=self.config.tree_depth {
			let diff = (self.config.tree_depth - depth) as u32;
			let mut per_depth = 1usize;
			for axis in 0..3 {
				let n = ((query.max[axis] - mv) >> diff) - ((query.min[axis] - mv) >> diff) + 1;
				per_depth = per_depth.saturating_mul(n as usize);
			}
			total = total.saturating_add(per_depth);
			if total > limit {
				break;
			}
		}
		total
	}

	/// Look up every node of every depth intersecting `query`.
	fn lookup_candidates(&self, query: &KeySpan, out: &mut Vec<LeafCell>) {
		let mv = self.config.max_key_val();
		for depth in 1..=self.config.tree_depth {
			if self.depth_counts[depth as usize] == 0 {
				continue;
			}
			let diff = (self.config.tree_depth - depth) as u32;
			let half = if diff > 0 { 1 << (diff - 1) } else { 0 };
			let node = |axis: usize| ((query.min[axis] - mv) >> diff)..=((query.max[axis] - mv) >> diff);
			let to_key = |i: i32| ((i << diff) + mv + half) as u16;
			for ix in node(0) {
				for iy in node(1) {
					for iz in node(2) {
						let key = SpatialKey::new(to_key(ix), to_key(iy), to_key(iz));
						if self.leaves.get(&key) == Some(&depth) {
							out.push(self.cell(key, depth));
						}
					}
				}
			}
		}
	}

	/// Test every leaf against `query`, collapsing leaves deeper than `limit`.
	fn scan(&self, query: &KeySpan, limit: u8, out: &mut Vec<LeafCell>) {
		let mut seen = HashSet::new();
		for (&key, &depth) in &self.leaves {
			let (key, depth) = if depth > limit {
				(self.config.adjust_key(key, limit), limit)
			} else {
				(key, depth)
			};
			if self.config.key_span(key, depth).overlaps(query) && seen.insert(key) {
				out.push(self.cell(key, depth));
			}
		}
	}

	// =========================================================================
	// File I/O
	// =========================================================================

	/// Read an octree previously stored with [`LeafOctree::write`].
	pub fn read(path: impl AsRef<Path>) -> OctreeResult<Self> {
		let path = path.as_ref();
		if !path.exists() {
			return Err(OctreeError::FileNotFound(path.to_path_buf()));
		}
		let bytes = fs::read(path)?;
		let mut tree = Self::decode(&bytes)?;
		tree.path = Some(path.to_path_buf());
		debug!(path = %path.display(), leaves = tree.len(), "read octree");
		Ok(tree)
	}

	/// Store the octree at `path` and bind it to that path.
	pub fn write(&mut self, path: impl AsRef<Path>) -> OctreeResult<()> {
		let path = path.as_ref();
		fs::write(path, self.encode())?;
		self.path = Some(path.to_path_buf());
		debug!(path = %path.display(), leaves = self.len(), "wrote octree");
		Ok(())
	}

	fn encode(&self) -> Vec<u8> {
		let mut entries: Vec<(SpatialKey, u8)> = self.leaves.iter().map(|(&k, &d)| (k, d)).collect();
		entries.sort_unstable();

		let mut enc = Encoder::new(FILE_MAGIC, FILE_VERSION);
		enc.put_f64(self.config.resolution);
		enc.put_u8(self.config.tree_depth);
		enc.put_len(entries.len());
		for (key, depth) in entries {
			enc.put_key(key);
			enc.put_u8(depth);
		}
		enc.finish()
	}

	fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
		let mut dec = Decoder::open(bytes, FILE_MAGIC, FILE_VERSION)?;
		let resolution = dec.f64()?;
		let tree_depth = dec.u8()?;
		let config = OctreeConfig::new(resolution, tree_depth)
			.map_err(|e| DecodeError::Invalid(e.to_string()))?;

		let mut tree = Self::from_config(config);
		let count = dec.seq_len(7)?;
		for _ in 0..count {
			let key = dec.key()?;
			let depth = dec.u8()?;
			config
				.check_depth(depth)
				.map_err(|e| DecodeError::Invalid(e.to_string()))?;
			if config.adjust_key(key, depth) != key {
				return Err(DecodeError::Invalid(format!(
					"key {key} is not aligned to depth {depth}"
				)));
			}
			if tree.contains(&key) || tree.place(key, depth) > 0 {
				return Err(DecodeError::Invalid(format!(
					"leaf {key} at depth {depth} overlaps another leaf"
				)));
			}
		}
		dec.finish()?;
		Ok(tree)
	}
}

impl LeafSource for LeafOctree {
	type Leaves<'a>
		= std::vec::IntoIter<LeafCell>
	where
		Self: 'a;

	fn resolution(&self) -> f64 {
		self.config.resolution
	}

	fn metric_bounds(&self) -> DAabb3 {
		self
			.leaves()
			.map(|cell| cell.aabb())
			.reduce(|acc, b| acc.union(&b))
			.unwrap_or(DAabb3::EMPTY)
	}

	fn leaf_range(&self, min: DVec3, max: DVec3, max_depth: u8) -> OctreeResult<Self::Leaves<'_>> {
		let tree_depth = self.config.tree_depth;
		if max_depth > tree_depth {
			return Err(OctreeError::InvalidDepth {
				depth: max_depth,
				tree_depth,
			});
		}
		let limit = if max_depth == 0 { tree_depth } else { max_depth };
		let query = KeySpan {
			min: self.config.coord_to_key_clamped(min.min(max)),
			max: self.config.coord_to_key_clamped(min.max(max)),
		};

		let mut cells = Vec::new();
		if limit == tree_depth && self.lookup_cost(&query, self.leaves.len()) <= self.leaves.len() {
			self.lookup_candidates(&query, &mut cells);
		} else {
			self.scan(&query, limit, &mut cells);
		}
		cells.sort_unstable_by_key(|c| c.key);
		Ok(cells.into_iter())
	}
}

impl OctreeStore for LeafOctree {
	fn load(path: &Path) -> OctreeResult<Self> {
		Self::read(path)
	}

	fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}
}

#[cfg(test)]
#[path = "leaves_test.rs"]
mod leaves_test;
