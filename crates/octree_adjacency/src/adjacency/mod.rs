//! Adjacency map over the leaves of an octree.
//!
//! Two leaves are adjacent when their boxes touch or overlap along every
//! axis, which covers face, edge and corner contact between cells of any
//! size. The map answers "which leaves touch this one" without going back to
//! the tree geometry; it must be rebuilt whenever the octree changes.
//!
//! # Module Structure
//!
//! - [`cache`]: `KeyCache` - interns keys into dense `NodeId`s
//! - [`node_info`]: `NodeInfoTable` - size and center of visited leaves
//! - [`builder`]: `AdjacencyBuilder` - the nested range-query traversal
//! - [`config`]: `AdjacencyConfig` - tolerance and depth limit

pub mod builder;
pub mod cache;
pub mod config;
pub mod node_info;

use smallvec::SmallVec;

use crate::octree::SpatialKey;

// Re-exports
pub use builder::{touches, AdjacencyBuilder};
pub use cache::{KeyCache, NodeId};
pub use config::{AdjacencyConfig, EPSILON};
pub use node_info::{NodeInfo, NodeInfoTable};

/// Neighbor ids of one leaf. Most leaves have few enough to stay inline.
pub type NeighborList = SmallVec<[NodeId; 8]>;

/// Adjacency lists plus node info produced by one build pass.
///
/// Read-only once built. A key with no neighbor list has no discovered
/// neighbors; whether it is a leaf at all is answered by
/// [`AdjacencyMap::node_info`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencyMap {
	pub(crate) keys: KeyCache,
	/// Indexed by `NodeId`; may be shorter than the key table.
	pub(crate) adjacencies: Vec<NeighborList>,
	pub(crate) nodes_info: NodeInfoTable,
}

impl AdjacencyMap {
	/// Neighbors of `key`, or `None` if it has none.
	pub fn adjacency(&self, key: &SpatialKey) -> Option<Neighbors<'_>> {
		let id = self.keys.get(key)?;
		let ids = self.neighbor_ids(id);
		if ids.is_empty() {
			return None;
		}
		Some(Neighbors {
			ids: ids.iter(),
			keys: &self.keys,
		})
	}

	/// Size and center of `key` if it was visited as a leaf.
	pub fn node_info(&self, key: &SpatialKey) -> Option<&NodeInfo> {
		self.nodes_info.get(self.keys.get(key)?)
	}

	/// Every key with at least one neighbor, with its neighbors, in id order.
	pub fn adjacencies(&self) -> impl Iterator<Item = (SpatialKey, Neighbors<'_>)> + '_ {
		self
			.adjacencies
			.iter()
			.enumerate()
			.filter(|(_, list)| !list.is_empty())
			.map(move |(i, list)| {
				(
					self.keys.key(NodeId::from_index(i)),
					Neighbors {
						ids: list.iter(),
						keys: &self.keys,
					},
				)
			})
	}

	/// Every visited leaf with its info, in id order.
	pub fn nodes_info(&self) -> impl Iterator<Item = (SpatialKey, &NodeInfo)> + '_ {
		self
			.nodes_info
			.iter()
			.map(move |(id, info)| (self.keys.key(id), info))
	}

	/// Dense id of `key`, usable with [`AdjacencyMap::neighbor_ids`].
	#[inline]
	pub fn node_id(&self, key: &SpatialKey) -> Option<NodeId> {
		self.keys.get(key)
	}

	/// Key of a dense id issued by this map.
	#[inline]
	pub fn key(&self, id: NodeId) -> SpatialKey {
		self.keys.key(id)
	}

	/// Neighbor ids of `id`; empty when it has none.
	#[inline]
	pub fn neighbor_ids(&self, id: NodeId) -> &[NodeId] {
		self
			.adjacencies
			.get(id.index())
			.map(|list| list.as_slice())
			.unwrap_or(&[])
	}

	/// Canonical key table.
	pub fn key_cache(&self) -> &KeyCache {
		&self.keys
	}

	/// Number of canonical keys.
	pub fn key_count(&self) -> usize {
		self.keys.len()
	}

	/// Number of leaves with node info.
	pub fn node_count(&self) -> usize {
		self.nodes_info.len()
	}

	/// Number of directed adjacency entries.
	pub fn edge_count(&self) -> usize {
		self.adjacencies.iter().map(|l| l.len()).sum()
	}

	/// True when the build saw no leaves.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub(crate) fn push_neighbor(&mut self, from: NodeId, to: NodeId) {
		let index = from.index();
		if index >= self.adjacencies.len() {
			self.adjacencies.resize_with(index + 1, NeighborList::new);
		}
		self.adjacencies[index].push(to);
	}
}

/// Iterator over the neighbor keys of one leaf.
#[derive(Clone)]
pub struct Neighbors<'a> {
	ids: std::slice::Iter<'a, NodeId>,
	keys: &'a KeyCache,
}

impl Iterator for Neighbors<'_> {
	type Item = SpatialKey;

	fn next(&mut self) -> Option<SpatialKey> {
		self.ids.next().map(|&id| self.keys.key(id))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.ids.size_hint()
	}
}

impl ExactSizeIterator for Neighbors<'_> {}
