use std::path::{Path, PathBuf};

mod accessor;
mod document;
mod json;
mod material;
mod scene;
mod v1;
mod v2;

pub use accessor::*;
pub use document::*;
pub use json::JsonKind;
pub use material::*;
pub use scene::*;

#[derive(Debug, thiserror::Error)]
pub enum GltfError {
	#[error("io error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("invalid json: {0}")]
	InvalidJSON(#[from] serde_json::error::Error),
	#[error("field \"{field}\" must be {expected}")]
	SchemaViolation { field: String, expected: JsonKind },
	#[error("field \"{field}\" references missing index {index}")]
	InvalidReference { field: String, index: usize },
	#[error("field \"{field}\" references unknown id \"{id}\"")]
	UnknownId { field: String, id: String },
	#[error("unsupported version \"{0}\"")]
	UnsupportedVersion(String),
	#[error("uri \"{0}\" must not be absolute")]
	AbsoluteURI(PathBuf),
	#[error("uri \"{0}\" must not reference parent directories")]
	ParentDirURI(PathBuf),
	#[error("invalid uri \"{0}\"")]
	InvalidURI(String),
	#[error("buffer {buffer} declares {declared} bytes but {actual} are available")]
	BufferLength { buffer: usize, declared: usize, actual: usize },
	#[error("{what} needs {needed} bytes but only {available} are available")]
	OutOfRange { what: String, needed: usize, available: usize },
	#[error("accessor {accessor} ({component_type}, {shape}) cannot be decoded as {kind}")]
	UnsupportedAccessorFormat { accessor: usize, component_type: u32, shape: AccessorType, kind: ElementKind },
	#[error("accessor {accessor} has {count} elements, more than the limit of {limit}")]
	ElementLimit { accessor: usize, count: usize, limit: usize },
	#[error("node {node} is its own ancestor")]
	CyclicGraph { node: usize },
	#[error("node hierarchy is deeper than {limit}")]
	DepthLimit { limit: usize },
	#[error("document has no scene to materialize")]
	NoScene,
	#[error("invalid binary glTF container")]
	InvalidGLB,
	#[error("invalid import config: {0}")]
	Config(String),
}

const GLB_MAGIC: u32 = 0x46546C67;
const GLB_CHUNK_JSON: u32 = 0x4E4F534A;
const GLB_CHUNK_BIN: u32 = 0x004E4942;

/// Splits a binary glTF container into its JSON text and optional BIN chunk.
///
/// Returns `None` if `file` does not start with the binary glTF magic.
pub fn split_glb(file: &[u8]) -> Result<Option<(&[u8], Option<&[u8]>)>, GltfError> {
	let Some((header, data)) = file.split_first_chunk::<12>() else {
		return Ok(None);
	};
	let (magic, rest) = header.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
	let (version, _) = rest.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
	if u32::from_le_bytes(*magic) != GLB_MAGIC {
		return Ok(None);
	}
	let version = u32::from_le_bytes(*version);
	if version != 2 {
		return Err(GltfError::UnsupportedVersion(format!("binary container version {version}")));
	}

	let (json_length, data) = data.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
	let (json_type, data) = data.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
	if u32::from_le_bytes(*json_type) != GLB_CHUNK_JSON {
		return Err(GltfError::InvalidGLB);
	}
	let (json_bytes, data) = data.split_at_checked(u32::from_le_bytes(*json_length) as usize).ok_or(GltfError::InvalidGLB)?;
	let bin = if !data.is_empty() {
		let (bin_length, data) = data.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
		let (bin_type, data) = data.split_first_chunk::<4>().ok_or(GltfError::InvalidGLB)?;
		if u32::from_le_bytes(*bin_type) == GLB_CHUNK_BIN {
			let (bin_data, _) = data.split_at_checked(u32::from_le_bytes(*bin_length) as usize).ok_or(GltfError::InvalidGLB)?;
			Some(bin_data)
		} else {
			None
		}
	} else {
		None
	};
	Ok(Some((json_bytes, bin)))
}

/// Resolves a relative resource uri against the document's base directory.
pub(crate) fn resolve_uri(base_dir: &Path, uri: &str) -> Result<PathBuf, GltfError> {
	if uri.starts_with("data:") || uri.contains("://") {
		return Err(GltfError::InvalidURI(uri.to_string()));
	}
	let path = PathBuf::from(uri);
	if path.is_absolute() {
		return Err(GltfError::AbsoluteURI(path));
	}
	if path.components().any(|c| c == std::path::Component::ParentDir) {
		return Err(GltfError::ParentDirURI(path));
	}
	Ok(base_dir.join(path))
}

/// Reads a buffer file, which must hold exactly `declared` bytes.
pub(crate) fn read_buffer_file(path: &Path, buffer: usize, declared: usize) -> Result<Vec<u8>, GltfError> {
	let data = std::fs::read(path)?;
	if data.len() != declared {
		return Err(GltfError::BufferLength { buffer, declared, actual: data.len() });
	}
	tracing::debug!("read buffer {} ({} bytes) from {}", buffer, declared, path.display());
	Ok(data)
}

/// Picks the schema a parsed document was written against.
pub fn detect_version(json: &serde_json::Value) -> Result<Version, GltfError> {
	let root = json::JsonObject::root(json)?;
	let version = match root.object("asset")? {
		Some(asset) => asset.string("version")?,
		None => None,
	};
	match version {
		Some(v) if v.starts_with("1.") || v == "1" => Ok(Version::V1),
		Some(v) if v.starts_with("2.") || v == "2" => Ok(Version::V2),
		Some(v) => Err(GltfError::UnsupportedVersion(v.to_string())),
		// version 1.0 documents may omit the asset block; their collections are keyed objects
		None if root.get("scenes").is_some_and(|s| s.is_object()) => Ok(Version::V1),
		None => Err(GltfError::SchemaViolation { field: String::from("asset.version"), expected: JsonKind::String }),
	}
}

/// Builds a [`Document`] from parsed JSON, reading external buffers relative to `base_dir`.
///
/// `embedded` supplies the binary chunk for a buffer without a uri.
pub fn parse(json: &serde_json::Value, base_dir: &Path, embedded: Option<&[u8]>) -> Result<Document, GltfError> {
	let document = match detect_version(json)? {
		Version::V1 => v1::parse_v1(json, base_dir)?,
		Version::V2 => v2::parse_v2(json, base_dir, embedded)?,
	};
	document.validate()?;
	tracing::debug!(
		"parsed {:?} document: {} nodes, {} meshes, {} accessors, {} buffers",
		document.version, document.nodes.len(), document.meshes.len(), document.accessors.len(), document.buffers.len(),
	);
	Ok(document)
}

pub fn parse_v1(json: &serde_json::Value, base_dir: &Path) -> Result<Document, GltfError> {
	let document = v1::parse_v1(json, base_dir)?;
	document.validate()?;
	Ok(document)
}

pub fn parse_v2(json: &serde_json::Value, base_dir: &Path, embedded: Option<&[u8]>) -> Result<Document, GltfError> {
	let document = v2::parse_v2(json, base_dir, embedded)?;
	document.validate()?;
	Ok(document)
}

/// Loads a `.gltf` or `.glb` file. Resources are resolved relative to the file's directory.
pub fn load(path: impl AsRef<Path>) -> Result<Document, GltfError> {
	let path = path.as_ref();
	let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
	let file = std::fs::read(path)?;
	match split_glb(&file)? {
		Some((json_bytes, bin)) => {
			let json = serde_json::from_slice::<serde_json::Value>(json_bytes)?;
			parse(&json, &base_dir, bin)
		},
		None => {
			let json = serde_json::from_slice::<serde_json::Value>(&file)?;
			parse(&json, &base_dir, None)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
		let mut out = Vec::new();
		let total = 12 + 8 + json.len() + 8 + bin.len();
		out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
		out.extend_from_slice(&2u32.to_le_bytes());
		out.extend_from_slice(&(total as u32).to_le_bytes());
		out.extend_from_slice(&(json.len() as u32).to_le_bytes());
		out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
		out.extend_from_slice(json);
		out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
		out.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
		out.extend_from_slice(bin);
		out
	}

	#[test]
	fn glb_chunks_are_split() {
		let file = glb(b"{}  ", &[1, 2, 3, 4]);
		let (json, bin) = split_glb(&file).unwrap().unwrap();
		assert_eq!(json, b"{}  ");
		assert_eq!(bin, Some(&[1u8, 2, 3, 4][..]));
	}

	#[test]
	fn plain_json_is_not_glb() {
		assert!(split_glb(b"{\"asset\": {\"version\": \"2.0\"}}").unwrap().is_none());
		assert!(split_glb(b"{}").unwrap().is_none());
	}

	#[test]
	fn glb_version_one_is_rejected() {
		let mut file = glb(b"{}  ", &[]);
		file[4] = 1;
		assert!(matches!(split_glb(&file), Err(GltfError::UnsupportedVersion(_))));
	}

	#[test]
	fn versions_are_detected() {
		assert_eq!(detect_version(&json!({ "asset": { "version": "2.0" } })).unwrap(), Version::V2);
		assert_eq!(detect_version(&json!({ "asset": { "version": "1.1" } })).unwrap(), Version::V1);
		assert_eq!(detect_version(&json!({ "scenes": { "s": { "nodes": [] } } })).unwrap(), Version::V1);
		assert!(matches!(detect_version(&json!({ "asset": { "version": "3.0" } })), Err(GltfError::UnsupportedVersion(_))));
		assert!(matches!(detect_version(&json!({})), Err(GltfError::SchemaViolation { .. })));
	}

	#[test]
	fn uris_stay_inside_base_dir() {
		let base = Path::new("assets/chair");
		assert_eq!(resolve_uri(base, "tex/wood.png").unwrap(), base.join("tex/wood.png"));
		assert!(matches!(resolve_uri(base, "../secret.bin"), Err(GltfError::ParentDirURI(_))));
		assert!(matches!(resolve_uri(base, "data:application/octet-stream;base64,AAAA"), Err(GltfError::InvalidURI(_))));
		assert!(matches!(resolve_uri(base, "https://example.com/a.bin"), Err(GltfError::InvalidURI(_))));
	}
}
