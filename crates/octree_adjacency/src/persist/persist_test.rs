use std::io;
use std::sync::{Arc, Mutex};

use glam::DVec3;
use tempfile::{tempdir, TempDir};

use super::*;
use crate::octree::{LeafOctree, SpatialKey};
use crate::test_utils::mixed_depth_octree;

/// Octree written to disk plus the map built from it.
fn saved_octree(dir: &TempDir) -> (LeafOctree, AdjacencyMap) {
	let mut tree = mixed_depth_octree();
	tree.write(dir.path().join("tree.oct")).unwrap();
	let map = AdjacencyMap::build(&tree).unwrap();
	(tree, map)
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
	fn contents(&self) -> String {
		String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
	}
}

impl io::Write for LogBuffer {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

// =========================================================================
// Round trip
// =========================================================================

#[test]
fn test_round_trip() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");

	map.write(&tree, &dest).unwrap();
	let (loaded, octree): (AdjacencyMap, LeafOctree) = AdjacencyMap::read(&dest).unwrap();

	assert_eq!(loaded, map);
	assert_eq!(octree.path(), tree.path());
	assert_eq!(octree.len(), tree.len());
}

/// Ids survive the round trip, so id-based lookups agree.
#[test]
fn test_round_trip_preserves_ids() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	map.write(&tree, &dest).unwrap();

	let (loaded, _) = load::<LeafOctree>(&dest).unwrap();

	for (id, key) in map.key_cache().iter() {
		assert_eq!(loaded.node_id(&key), Some(id));
		assert_eq!(loaded.neighbor_ids(id), map.neighbor_ids(id));
	}
}

#[test]
fn test_round_trip_empty_map() {
	let dir = tempdir().unwrap();
	let mut tree = LeafOctree::new(0.25).unwrap();
	tree.write(dir.path().join("empty.oct")).unwrap();
	let map = AdjacencyMap::build(&tree).unwrap();
	let dest = dir.path().join("empty.adj");

	map.write(&tree, &dest).unwrap();
	let (loaded, octree) = load::<LeafOctree>(&dest).unwrap();

	assert!(loaded.is_empty());
	assert_eq!(loaded, map);
	assert!(octree.is_empty());
}

#[test]
fn test_save_leaves_no_staging_file() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	map.write(&tree, dir.path().join("map.adj")).unwrap();

	let mut names: Vec<_> = fs::read_dir(dir.path())
		.unwrap()
		.map(|e| e.unwrap().file_name().into_string().unwrap())
		.collect();
	names.sort();
	assert_eq!(names, vec!["map.adj", "tree.oct"]);
}

/// Files that merely look like staging files are left alone.
#[test]
fn test_save_keeps_unrelated_tmp_sibling() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	let sibling = dir.path().join("map.adj.tmp");
	fs::write(&sibling, b"user data").unwrap();

	map.write(&tree, &dest).unwrap();
	map.write(&tree, &dest).unwrap();

	assert_eq!(fs::read(&sibling).unwrap(), b"user data");
	let (loaded, _) = load::<LeafOctree>(&dest).unwrap();
	assert_eq!(loaded, map);
}

/// Concurrent saves to one destination each leave a complete record.
#[test]
fn test_concurrent_saves_to_same_destination() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");

	std::thread::scope(|s| {
		for _ in 0..4 {
			s.spawn(|| map.write(&tree, &dest).unwrap());
		}
	});

	let (loaded, _) = load::<LeafOctree>(&dest).unwrap();
	assert_eq!(loaded, map);
	assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_overwrite_replaces_content_and_warns() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	AdjacencyMap::default().write(&tree, &dest).unwrap();

	let logs = LogBuffer::default();
	let writer = logs.clone();
	let subscriber = tracing_subscriber::fmt()
		.with_writer(move || writer.clone())
		.with_ansi(false)
		.finish();
	tracing::subscriber::with_default(subscriber, || map.write(&tree, &dest)).unwrap();

	assert!(logs.contents().contains("already exists"));
	let (loaded, _) = load::<LeafOctree>(&dest).unwrap();
	assert_eq!(loaded, map);
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn test_load_missing_file() {
	let dir = tempdir().unwrap();
	let missing = dir.path().join("nope.adj");
	assert!(matches!(
		load::<LeafOctree>(&missing),
		Err(PersistError::FileNotFound(p)) if p == missing
	));
}

#[test]
fn test_load_garbage() {
	let dir = tempdir().unwrap();
	let dest = dir.path().join("garbage.adj");
	fs::write(&dest, b"definitely not an adjacency map").unwrap();

	assert!(matches!(
		load::<LeafOctree>(&dest),
		Err(PersistError::CorruptData(DecodeError::BadMagic { .. }))
	));
}

#[test]
fn test_load_truncated() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	map.write(&tree, &dest).unwrap();

	let bytes = fs::read(&dest).unwrap();
	fs::write(&dest, &bytes[..bytes.len() / 2]).unwrap();
	assert!(matches!(
		load::<LeafOctree>(&dest),
		Err(PersistError::CorruptData(_))
	));

	fs::write(&dest, &bytes[..6]).unwrap();
	assert!(matches!(
		load::<LeafOctree>(&dest),
		Err(PersistError::CorruptData(DecodeError::UnexpectedEof { .. }))
	));
}

#[test]
fn test_load_flipped_byte() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	map.write(&tree, &dest).unwrap();

	let mut bytes = fs::read(&dest).unwrap();
	let mid = bytes.len() / 2;
	bytes[mid] ^= 0x40;
	fs::write(&dest, &bytes).unwrap();

	assert!(matches!(
		load::<LeafOctree>(&dest),
		Err(PersistError::CorruptData(DecodeError::ChecksumMismatch { .. }))
	));
}

#[test]
fn test_load_unsupported_version() {
	let dir = tempdir().unwrap();
	let dest = dir.path().join("future.adj");
	let mut enc = Encoder::new(FILE_MAGIC, FILE_VERSION + 1);
	enc.put_str("tree.oct");
	fs::write(&dest, enc.finish()).unwrap();

	assert!(matches!(
		load::<LeafOctree>(&dest),
		Err(PersistError::CorruptData(DecodeError::UnsupportedVersion { found: 2, supported: 1 }))
	));
}

#[test]
fn test_load_octree_removed_after_save() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("map.adj");
	map.write(&tree, &dest).unwrap();

	let octree_path = tree.path().unwrap().to_path_buf();
	fs::remove_file(&octree_path).unwrap();

	match load::<LeafOctree>(&dest) {
		Err(PersistError::OctreeLoad { path, source }) => {
			assert_eq!(path, octree_path);
			assert!(matches!(source, crate::error::OctreeError::FileNotFound(_)));
		}
		other => panic!("expected OctreeLoad, got {other:?}"),
	}
}

#[test]
fn test_write_requires_bound_octree() {
	let dir = tempdir().unwrap();
	let tree = mixed_depth_octree();
	let map = AdjacencyMap::build(&tree).unwrap();
	let dest = dir.path().join("map.adj");

	assert!(matches!(
		map.write(&tree, &dest),
		Err(PersistError::MissingOctreePath)
	));
	assert!(!dest.exists());
}

#[test]
fn test_save_into_missing_directory() {
	let dir = tempdir().unwrap();
	let (tree, map) = saved_octree(&dir);
	let dest = dir.path().join("no").join("such").join("map.adj");

	assert!(matches!(map.write(&tree, &dest), Err(PersistError::Io(_))));
}

#[cfg(unix)]
#[test]
fn test_save_rejects_non_utf8_octree_path() {
	use std::ffi::OsStr;
	use std::os::unix::ffi::OsStrExt;

	let dir = tempdir().unwrap();
	let octree_path = dir.path().join(OsStr::from_bytes(b"tree\xff.oct"));
	let dest = dir.path().join("map.adj");

	assert!(matches!(
		save(&AdjacencyMap::default(), &octree_path, &dest),
		Err(PersistError::NonUtf8Path(p)) if p == octree_path
	));
}

// =========================================================================
// Structural validation
// =========================================================================

fn record(build: impl FnOnce(&mut Encoder)) -> Vec<u8> {
	let mut enc = Encoder::new(FILE_MAGIC, FILE_VERSION);
	enc.put_str("tree.oct");
	build(&mut enc);
	enc.finish()
}

fn put_keys(enc: &mut Encoder, keys: &[SpatialKey]) {
	enc.put_len(keys.len());
	for &key in keys {
		enc.put_key(key);
	}
}

#[test]
fn test_decode_minimal_record() {
	let bytes = record(|enc| {
		put_keys(enc, &[SpatialKey::new(1, 2, 3), SpatialKey::new(2, 2, 3)]);
		enc.put_len(1);
		enc.put_u32(0);
		enc.put_len(1);
		enc.put_u32(1);
		enc.put_len(1);
		enc.put_u32(0);
		enc.put_f64(0.5);
		enc.put_point(DVec3::new(1.0, 2.0, 3.0));
	});

	let (map, path) = decode(&bytes).unwrap();

	assert_eq!(path, PathBuf::from("tree.oct"));
	let neighbors: Vec<_> = map.adjacency(&SpatialKey::new(1, 2, 3)).unwrap().collect();
	assert_eq!(neighbors, vec![SpatialKey::new(2, 2, 3)]);
	assert_eq!(map.node_info(&SpatialKey::new(1, 2, 3)).map(|i| i.size), Some(0.5));
	assert!(map.node_info(&SpatialKey::new(2, 2, 3)).is_none());
}

#[test]
fn test_decode_rejects_dangling_id() {
	let bytes = record(|enc| {
		put_keys(enc, &[SpatialKey::new(1, 1, 1)]);
		enc.put_len(1);
		enc.put_u32(0);
		enc.put_len(1);
		enc.put_u32(5);
		enc.put_len(0);
	});
	assert!(matches!(decode(&bytes), Err(DecodeError::Invalid(_))));
}

#[test]
fn test_decode_rejects_duplicate_key() {
	let bytes = record(|enc| {
		put_keys(enc, &[SpatialKey::new(1, 1, 1), SpatialKey::new(1, 1, 1)]);
		enc.put_len(0);
		enc.put_len(0);
	});
	assert!(matches!(decode(&bytes), Err(DecodeError::Invalid(_))));
}

#[test]
fn test_decode_rejects_self_adjacency() {
	let bytes = record(|enc| {
		put_keys(enc, &[SpatialKey::new(1, 1, 1)]);
		enc.put_len(1);
		enc.put_u32(0);
		enc.put_len(1);
		enc.put_u32(0);
		enc.put_len(0);
	});
	assert!(matches!(decode(&bytes), Err(DecodeError::Invalid(_))));
}

#[test]
fn test_decode_rejects_trailing_bytes() {
	let bytes = record(|enc| {
		put_keys(enc, &[]);
		enc.put_len(0);
		enc.put_len(0);
		enc.put_u8(7);
	});
	assert_eq!(decode(&bytes).unwrap_err(), DecodeError::TrailingBytes(1));
}
