//! Configuration parsing for adjacency builds.

use anyhow::{Context, Result};
use octree_adjacency::AdjacencyConfig;
use serde::Deserialize;
use std::path::Path;

/// Root configuration. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Touch tolerance and depth limit of the builder.
	pub adjacency: AdjacencyConfig,
	/// How the build is run.
	pub build: BuildSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
	/// Run neighbor queries on the rayon thread pool.
	pub parallel: bool,
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;

		let epsilon = config.adjacency.epsilon;
		if !epsilon.is_finite() || epsilon < 0.0 {
			anyhow::bail!("epsilon must be finite and non-negative, got {}", epsilon);
		}
		if config.adjacency.max_depth > 16 {
			anyhow::bail!(
				"max_depth must be at most 16, got {}",
				config.adjacency.max_depth
			);
		}

		Ok(config)
	}
}
