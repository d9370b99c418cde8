//! Octree adjacency tool.
//!
//! Builds adjacency maps from octree files and inspects saved maps.
//!
//! Log verbosity follows `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=octree_adjacency=debug octree-adjacency build ...`.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use octree_adjacency::octree::{LeafOctree, LeafSource, OctreeStore, SpatialKey};
use octree_adjacency::{AdjacencyBuilder, AdjacencyMap};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

/// Adjacency graphs over the leaves of sparse octrees.
#[derive(Parser, Debug)]
#[command(name = "octree-adjacency")]
#[command(about = "Builds and inspects octree leaf adjacency maps")]
struct Args {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Build the adjacency map of an octree file and save it.
	Build {
		/// Octree file to read.
		#[arg(short, long)]
		octree: PathBuf,

		/// Destination of the adjacency map. Replaced if it exists.
		#[arg(short = 'O', long)]
		output: PathBuf,

		/// Path to configuration TOML file.
		#[arg(short, long)]
		config: Option<PathBuf>,

		/// Run neighbor queries in parallel (overrides the config).
		#[arg(long)]
		parallel: bool,
	},
	/// Print a summary of a saved adjacency map.
	Inspect {
		/// Adjacency map file.
		map: PathBuf,
	},
	/// Print the neighbors of one leaf key.
	Neighbors {
		/// Adjacency map file.
		map: PathBuf,
		x: u16,
		y: u16,
		z: u16,
	},
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	match Args::parse().command {
		Command::Build {
			octree,
			output,
			config,
			parallel,
		} => build(&octree, &output, config.as_deref(), parallel),
		Command::Inspect { map } => inspect(&map),
		Command::Neighbors { map, x, y, z } => neighbors(&map, SpatialKey::new(x, y, z)),
	}
}

fn build(octree_path: &Path, output: &Path, config: Option<&Path>, parallel: bool) -> Result<()> {
	let config = match config {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};
	let parallel = parallel || config.build.parallel;

	let tree = LeafOctree::read(octree_path)
		.with_context(|| format!("Failed to read octree: {}", octree_path.display()))?;
	info!(leaves = tree.len(), resolution = tree.resolution(), parallel, "loaded octree");

	let builder = AdjacencyBuilder::new(config.adjacency);
	let map = if parallel {
		builder.build_parallel(&tree)
	} else {
		builder.build(&tree)
	}
	.context("Adjacency build failed")?;

	map
		.write(&tree, output)
		.with_context(|| format!("Failed to save adjacency map: {}", output.display()))?;

	println!(
		"{} leaves, {} adjacency entries -> {}",
		map.node_count(),
		map.edge_count(),
		output.display()
	);
	Ok(())
}

fn read_map(path: &Path) -> Result<(AdjacencyMap, LeafOctree)> {
	AdjacencyMap::read(path)
		.with_context(|| format!("Failed to load adjacency map: {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
	let (map, tree) = read_map(path)?;

	// Leaf counts per cell size, keyed by the size's bit pattern for ordering.
	let mut by_size: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
	for (_, info) in map.nodes_info() {
		by_size.entry(info.size.to_bits()).or_insert((info.size, 0)).1 += 1;
	}
	let degrees: Vec<usize> = map.adjacencies().map(|(_, n)| n.len()).collect();
	let max_degree = degrees.iter().copied().max().unwrap_or(0);

	let octree_path = tree.path().map(Path::display);
	println!("map:        {}", path.display());
	if let Some(octree_path) = octree_path {
		println!("octree:     {}", octree_path);
	}
	println!("resolution: {}", tree.resolution());
	println!("keys:       {}", map.key_count());
	println!("leaves:     {}", map.node_count());
	println!("entries:    {}", map.edge_count());
	println!("isolated:   {}", map.node_count().saturating_sub(degrees.len()));
	println!("max degree: {}", max_degree);
	println!("leaf sizes:");
	for (size, count) in by_size.values() {
		println!("  {:>10} x {}", size, count);
	}
	Ok(())
}

fn neighbors(path: &Path, key: SpatialKey) -> Result<()> {
	let (map, _) = read_map(path)?;

	let Some(info) = map.node_info(&key) else {
		anyhow::bail!("{} is not a leaf of this map", key);
	};
	println!("{} size {} center {}", key, info.size, info.center);

	match map.adjacency(&key) {
		Some(neighbors) => {
			for neighbor in neighbors {
				match map.node_info(&neighbor) {
					Some(n) => println!("  {} size {} center {}", neighbor, n.size, n.center),
					None => println!("  {}", neighbor),
				}
			}
		}
		None => println!("  no neighbors"),
	}
	Ok(())
}
