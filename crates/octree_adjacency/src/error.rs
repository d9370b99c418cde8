//! Error types for octree access, adjacency builds and persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use crate::codec::DecodeError;

/// Failure reported by an octree collaborator.
#[derive(Debug, Error)]
pub enum OctreeError {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
	#[error("octree file {0} does not exist")]
	FileNotFound(PathBuf),
	#[error("corrupt octree file: {0}")]
	Corrupt(#[from] DecodeError),
	#[error("coordinate ({x}, {y}, {z}) is outside the addressable octree space")]
	OutOfBounds { x: f64, y: f64, z: f64 },
	#[error("depth {depth} is not a valid leaf depth (tree depth {tree_depth})")]
	InvalidDepth { depth: u8, tree_depth: u8 },
	#[error("resolution must be finite and positive, got {0}")]
	InvalidResolution(f64),
}

/// Failure of an adjacency build.
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("octree query failed: {0}")]
	Octree(#[from] OctreeError),
	#[error("adjacency build cancelled")]
	Cancelled,
}

/// Failure to save or load a persisted adjacency map.
#[derive(Debug, Error)]
pub enum PersistError {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
	#[error("adjacency file {0} does not exist")]
	FileNotFound(PathBuf),
	#[error("corrupt adjacency data: {0}")]
	CorruptData(#[from] DecodeError),
	#[error("failed to load backing octree from {path}: {source}")]
	OctreeLoad {
		path: PathBuf,
		#[source]
		source: OctreeError,
	},
	#[error("octree path {0} is not valid UTF-8")]
	NonUtf8Path(PathBuf),
	#[error("octree is not bound to a file; write or read it before saving the map")]
	MissingOctreePath,
}

pub type OctreeResult<T> = std::result::Result<T, OctreeError>;
