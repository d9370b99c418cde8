//! Size and center of every leaf visited by a build.

use glam::DVec3;

use super::NodeId;

/// Geometry of a leaf as reported by the octree at build time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeInfo {
	/// Edge length of the cell.
	pub size: f64,
	/// Center of the cell in world units.
	pub center: DVec3,
}

/// Node info indexed by [`NodeId`].
///
/// Keys that were only seen as neighbors have no entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeInfoTable {
	entries: Vec<Option<NodeInfo>>,
	len: usize,
}

impl NodeInfoTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record or overwrite the info of `id`.
	pub fn record(&mut self, id: NodeId, info: NodeInfo) {
		let index = id.index();
		if index >= self.entries.len() {
			self.entries.resize(index + 1, None);
		}
		if self.entries[index].replace(info).is_none() {
			self.len += 1;
		}
	}

	#[inline]
	pub fn get(&self, id: NodeId) -> Option<&NodeInfo> {
		self.entries.get(id.index()).and_then(Option::as_ref)
	}

	/// Number of recorded entries.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Recorded entries in id order.
	pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeInfo)> + '_ {
		self
			.entries
			.iter()
			.enumerate()
			.filter_map(|(i, e)| e.as_ref().map(|info| (NodeId::from_index(i), info)))
	}
}
