use std::path::Path;

use crate::gltf::GltfError;

/// Knobs for a single import.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ImportConfig {
	/// Longest root-to-leaf node path traversal will follow before giving up.
	pub max_depth: usize,
	/// Scene to materialize instead of the document's default scene.
	pub scene: Option<usize>,
}

impl Default for ImportConfig {
	fn default() -> Self {
		Self { max_depth: 256, scene: None }
	}
}

impl ImportConfig {
	pub fn from_ron(s: &str) -> Result<Self, GltfError> {
		ron::from_str(s).map_err(|e| GltfError::Config(e.to_string()))
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, GltfError> {
		Self::from_ron(&std::fs::read_to_string(path)?)
	}
}
