//! Binary persistence of adjacency maps.
//!
//! A saved map holds the key table, the adjacency lists, the node info and
//! the path of the octree it was built from. Loading re-reads the octree
//! from that path; nothing checks that the octree still matches the map.
//!
//! # File Layout
//!
//! ```text
//! magic     "OCTADJ\0\0"
//! version   u16
//! path      u32 len + UTF-8
//! keys      u32 count + count * (u16, u16, u16)      id order
//! graph     u32 count + count * (u32 id, u32 n, n * u32 id)
//! nodes     u32 count + count * (u32 id, f64 size, 3 * f64 center)
//! crc32     u32 over everything after the version
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::adjacency::{AdjacencyMap, KeyCache, NodeId, NodeInfo};
use crate::codec::{Decoder, Encoder};
use crate::error::{DecodeError, PersistError};
use crate::octree::OctreeStore;

const FILE_MAGIC: &[u8; 8] = b"OCTADJ\0\0";
const FILE_VERSION: u16 = 1;

// Minimum encoded sizes used to bound sequence lengths.
const KEY_SIZE: usize = 6;
const LIST_HEADER_SIZE: usize = 8;
const ID_SIZE: usize = 4;
const NODE_INFO_SIZE: usize = 4 + 8 * 4;

/// Store `map` at `destination`, recording `octree_path` as its octree.
///
/// An existing file is replaced. The record is written to a uniquely named
/// sibling file first and renamed into place, so readers never see a
/// partial record.
#[tracing::instrument(skip_all, name = "adjacency::save", fields(dest = %destination.display()))]
pub fn save(map: &AdjacencyMap, octree_path: &Path, destination: &Path) -> Result<(), PersistError> {
	let Some(octree_path) = octree_path.to_str() else {
		error!(octree = %octree_path.display(), "octree path is not valid UTF-8");
		return Err(PersistError::NonUtf8Path(octree_path.to_path_buf()));
	};
	if destination.exists() {
		warn!(
			path = %destination.display(),
			"adjacency file already exists, content will be replaced"
		);
	}

	let bytes = encode(map, octree_path);
	if let Err(e) = write_replacing(destination, &bytes) {
		error!(error = %e, "failed to write adjacency file");
		return Err(e.into());
	}

	info!(
		bytes = bytes.len(),
		keys = map.key_count(),
		edges = map.edge_count(),
		octree = octree_path,
		"saved adjacency map"
	);
	Ok(())
}

/// Read the map stored at `source` and reload the octree it refers to.
#[tracing::instrument(skip_all, name = "adjacency::load", fields(source = %source.display()))]
pub fn load<O: OctreeStore>(source: &Path) -> Result<(AdjacencyMap, O), PersistError> {
	if !source.exists() {
		error!("adjacency file does not exist");
		return Err(PersistError::FileNotFound(source.to_path_buf()));
	}
	let bytes = fs::read(source).map_err(|e| {
		error!(error = %e, "failed to read adjacency file");
		PersistError::Io(e)
	})?;
	let (map, octree_path) = decode(&bytes).map_err(|e| {
		error!(error = %e, "corrupt adjacency file");
		PersistError::CorruptData(e)
	})?;
	debug!(keys = map.key_count(), octree = %octree_path.display(), "decoded adjacency map");

	let octree = O::load(&octree_path).map_err(|e| {
		error!(octree = %octree_path.display(), error = %e, "failed to load backing octree");
		PersistError::OctreeLoad {
			path: octree_path.clone(),
			source: e,
		}
	})?;

	info!(
		keys = map.key_count(),
		leaves = map.node_count(),
		edges = map.edge_count(),
		"loaded adjacency map"
	);
	Ok((map, octree))
}

impl AdjacencyMap {
	/// Store the map next to the file `octree` is bound to.
	///
	/// Fails with [`PersistError::MissingOctreePath`] when the octree was
	/// never read from or written to disk.
	pub fn write<O: OctreeStore>(
		&self,
		octree: &O,
		destination: impl AsRef<Path>,
	) -> Result<(), PersistError> {
		let octree_path = octree.path().ok_or(PersistError::MissingOctreePath)?;
		save(self, octree_path, destination.as_ref())
	}

	/// Load a map and its octree. See [`load`].
	pub fn read<O: OctreeStore>(source: impl AsRef<Path>) -> Result<(Self, O), PersistError> {
		load(source.as_ref())
	}
}

/// Write `bytes` to a uniquely named file next to `destination`, then move
/// it into place. The staging file is removed if anything fails.
fn write_replacing(destination: &Path, bytes: &[u8]) -> io::Result<()> {
	let dir = match destination.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let mut staging = NamedTempFile::new_in(dir)?;
	staging.write_all(bytes)?;
	staging.as_file().sync_all()?;
	staging.persist(destination).map_err(|e| e.error)?;
	Ok(())
}

// =============================================================================
// Encoding
// =============================================================================

fn encode(map: &AdjacencyMap, octree_path: &str) -> Vec<u8> {
	let mut enc = Encoder::new(FILE_MAGIC, FILE_VERSION);
	enc.put_str(octree_path);

	enc.put_len(map.keys.len());
	for (_, key) in map.keys.iter() {
		enc.put_key(key);
	}

	let lists: Vec<(usize, &[NodeId])> = map
		.adjacencies
		.iter()
		.enumerate()
		.filter(|(_, list)| !list.is_empty())
		.map(|(i, list)| (i, list.as_slice()))
		.collect();
	enc.put_len(lists.len());
	for (id, list) in lists {
		enc.put_u32(id as u32);
		enc.put_len(list.len());
		for neighbor in list {
			enc.put_u32(neighbor.index() as u32);
		}
	}

	enc.put_len(map.nodes_info.len());
	for (id, info) in map.nodes_info.iter() {
		enc.put_u32(id.index() as u32);
		enc.put_f64(info.size);
		enc.put_point(info.center);
	}

	enc.finish()
}

fn decode(bytes: &[u8]) -> Result<(AdjacencyMap, PathBuf), DecodeError> {
	let mut dec = Decoder::open(bytes, FILE_MAGIC, FILE_VERSION)?;
	let octree_path = PathBuf::from(dec.str()?);

	let key_count = dec.seq_len(KEY_SIZE)?;
	let mut keys = KeyCache::with_capacity(key_count);
	for _ in 0..key_count {
		let key = dec.key()?;
		if keys.get(&key).is_some() {
			return Err(DecodeError::Invalid(format!("duplicate key {key}")));
		}
		keys.get_or_insert(key);
	}
	let node_id = |raw: u32| -> Result<NodeId, DecodeError> {
		let index = raw as usize;
		if index < key_count {
			Ok(NodeId::from_index(index))
		} else {
			Err(DecodeError::Invalid(format!(
				"node id {raw} out of range for {key_count} keys"
			)))
		}
	};

	let mut map = AdjacencyMap {
		keys,
		..Default::default()
	};

	let list_count = dec.seq_len(LIST_HEADER_SIZE)?;
	for _ in 0..list_count {
		let id = node_id(dec.u32()?)?;
		if !map.neighbor_ids(id).is_empty() {
			return Err(DecodeError::Invalid(format!(
				"duplicate neighbor list for node {}",
				id.index()
			)));
		}
		let len = dec.seq_len(ID_SIZE)?;
		if len == 0 {
			return Err(DecodeError::Invalid(format!(
				"empty neighbor list for node {}",
				id.index()
			)));
		}
		for _ in 0..len {
			let neighbor = node_id(dec.u32()?)?;
			if neighbor == id {
				return Err(DecodeError::Invalid(format!(
					"node {} lists itself as a neighbor",
					id.index()
				)));
			}
			map.push_neighbor(id, neighbor);
		}
	}

	let info_count = dec.seq_len(NODE_INFO_SIZE)?;
	for _ in 0..info_count {
		let id = node_id(dec.u32()?)?;
		let size = dec.f64()?;
		let center = dec.point()?;
		if map.nodes_info.get(id).is_some() {
			return Err(DecodeError::Invalid(format!(
				"duplicate node info for node {}",
				id.index()
			)));
		}
		map.nodes_info.record(id, NodeInfo { size, center });
	}

	dec.finish()?;
	Ok((map, octree_path))
}

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;
