//! Canonical key cache.
//!
//! Every key the builder meets, whether as the current leaf or as a
//! candidate neighbor, is interned once and referred to by a dense
//! [`NodeId`] afterwards. Adjacency lists and the node info table store ids,
//! so the same key is never held twice.

use std::collections::HashMap;

use crate::octree::SpatialKey;

/// Dense index of a canonical key, assigned in first-seen order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);

impl NodeId {
	/// Position of the key in insertion order.
	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}

	#[inline]
	pub(crate) fn from_index(index: usize) -> Self {
		debug_assert!(index <= u32::MAX as usize);
		Self(index as u32)
	}
}

/// Interner mapping value-equal keys to one canonical entry.
///
/// Grows monotonically; there is no removal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyCache {
	ids: HashMap<SpatialKey, NodeId>,
	keys: Vec<SpatialKey>,
}

impl KeyCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			ids: HashMap::with_capacity(capacity),
			keys: Vec::with_capacity(capacity),
		}
	}

	/// Id of the canonical entry equal to `key`, inserting it if unseen.
	pub fn get_or_insert(&mut self, key: SpatialKey) -> NodeId {
		if let Some(&id) = self.ids.get(&key) {
			return id;
		}
		let id = NodeId::from_index(self.keys.len());
		self.keys.push(key);
		self.ids.insert(key, id);
		id
	}

	/// Id of `key` without inserting it.
	#[inline]
	pub fn get(&self, key: &SpatialKey) -> Option<NodeId> {
		self.ids.get(key).copied()
	}

	/// Canonical key for `id`.
	///
	/// # Panics
	/// If `id` was not issued by this cache.
	#[inline]
	pub fn key(&self, id: NodeId) -> SpatialKey {
		self.keys[id.index()]
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Canonical keys in id order.
	pub fn iter(&self) -> impl ExactSizeIterator<Item = (NodeId, SpatialKey)> + '_ {
		self
			.keys
			.iter()
			.enumerate()
			.map(|(i, &k)| (NodeId::from_index(i), k))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_equal_keys_share_one_entry() {
		let mut cache = KeyCache::new();
		let a = cache.get_or_insert(SpatialKey::new(1, 2, 3));
		let b = cache.get_or_insert(SpatialKey::new(1, 2, 3));
		assert_eq!(a, b);
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn test_ids_follow_first_seen_order() {
		let mut cache = KeyCache::new();
		let keys = [
			SpatialKey::new(9, 9, 9),
			SpatialKey::new(1, 1, 1),
			SpatialKey::new(5, 5, 5),
		];
		for k in keys {
			cache.get_or_insert(k);
		}
		cache.get_or_insert(keys[1]);

		let order: Vec<_> = cache.iter().map(|(_, k)| k).collect();
		assert_eq!(order, keys);
		assert_eq!(cache.get(&keys[2]).map(NodeId::index), Some(2));
	}

	#[test]
	fn test_first_value_is_canonical() {
		let mut cache = KeyCache::new();
		let key = SpatialKey::new(4, 5, 6);
		let id = cache.get_or_insert(key);
		assert_eq!(cache.key(id), key);
	}

	#[test]
	fn test_get_does_not_insert() {
		let cache = KeyCache::new();
		assert!(cache.get(&SpatialKey::new(0, 0, 0)).is_none());
		assert!(cache.is_empty());
	}
}
