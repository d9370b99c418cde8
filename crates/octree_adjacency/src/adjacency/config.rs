//! AdjacencyConfig - tuning of the touch test and range queries.

use serde::{Deserialize, Serialize};

/// Tolerance absorbing floating-point error in the touch test.
pub const EPSILON: f64 = 1e-3;

/// Build parameters. Defaults reproduce the reference behavior.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjacencyConfig {
	/// Slack allowed per axis between two cell boxes that still count as
	/// touching.
	pub epsilon: f64,

	/// Depth limit passed to every range query (0 = unconstrained).
	pub max_depth: u8,
}

impl Default for AdjacencyConfig {
	fn default() -> Self {
		Self {
			epsilon: EPSILON,
			max_depth: 0,
		}
	}
}
