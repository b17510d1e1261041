use std::path::Path;

use crate::math::{Quat, Transform, Vec3};

use super::json::{JsonKind, JsonObject};
use super::*;

fn parse_asset(root: &JsonObject) -> Result<AssetInfo, GltfError> {
	let asset = root.req_object("asset")?;
	Ok(AssetInfo {
		version: asset.req_string("version")?.to_string(),
		generator: asset.string("generator")?.map(String::from),
		copyright: asset.string("copyright")?.map(String::from),
		min_version: asset.string("minVersion")?.map(String::from),
	})
}

/// Node transform for version 2: each of translation, rotation and scale defaults
/// independently, and a matrix is only used when none of them are given.
fn parse_transform(node: &JsonObject) -> Result<Transform, GltfError> {
	let translation = node.floats::<3>("translation")?;
	let rotation = node.floats::<4>("rotation")?;
	let scale = node.floats::<3>("scale")?;
	let matrix = node.floats::<16>("matrix")?;
	Ok(match (translation, rotation, scale, matrix) {
		(None, None, None, Some(m)) => Transform::from_cols_slice(&m),
		_ => Transform::new(
			translation.map(Vec3::from).unwrap_or(Vec3::ZERO),
			rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
			scale.map(Vec3::from).unwrap_or(Vec3::ONE),
		),
	})
}

fn parse_buffers(root: &JsonObject, base_dir: &Path, mut embedded: Option<&[u8]>) -> Result<Vec<Buffer>, GltfError> {
	let mut buffers = Vec::new();
	for (i, buffer) in root.objects("buffers")?.iter().enumerate() {
		let name = buffer.name()?;
		let declared = buffer.req_index("byteLength")?;
		let (source, data) = match (buffer.string("uri")?, embedded.take()) {
			(Some(uri), bin) => {
				embedded = bin;
				let path = resolve_uri(base_dir, uri)?;
				let data = read_buffer_file(&path, i, declared)?;
				(Some(path), data)
			},
			// binary chunks are padded to four bytes
			(None, Some(bin)) if bin.len() >= declared && bin.len() - declared < 4 => {
				(None, bin[..declared].to_vec())
			},
			(None, Some(bin)) => {
				return Err(GltfError::BufferLength { buffer: i, declared, actual: bin.len() });
			},
			(None, None) if declared == 0 => (None, Vec::new()),
			(None, None) => {
				return Err(GltfError::SchemaViolation { field: buffer.field("uri"), expected: JsonKind::String });
			},
		};
		buffers.push(Buffer { name, source, data });
	}
	Ok(buffers)
}

fn parse_buffer_view(view: &JsonObject) -> Result<BufferView, GltfError> {
	Ok(BufferView {
		buffer: view.req_index("buffer")?,
		byte_offset: view.index("byteOffset")?.unwrap_or(0),
		byte_length: view.req_index("byteLength")?,
		byte_stride: view.index("byteStride")?,
		target: view.code_enum("target", BufferTarget::from_repr)?,
	})
}

fn parse_accessor(accessor: &JsonObject) -> Result<Accessor, GltfError> {
	if accessor.contains("sparse") {
		tracing::warn!("{}: sparse substitution is not supported and will be ignored", accessor.field("sparse"));
	}
	Ok(Accessor {
		buffer_view: accessor.index("bufferView")?,
		byte_offset: accessor.index("byteOffset")?.unwrap_or(0),
		byte_stride: None,
		component_type: accessor.req_code("componentType")?,
		ty: accessor.req_str_enum("type", JsonKind::AccessorType)?,
		count: accessor.req_index("count")?,
		normalized: accessor.boolean("normalized")?.unwrap_or(false),
	})
}

fn parse_primitive(primitive: &JsonObject) -> Result<Primitive, GltfError> {
	Ok(Primitive {
		attributes: primitive.index_map("attributes")?.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
		indices: primitive.index("indices")?,
		material: primitive.index("material")?,
		mode: primitive.code_enum("mode", Mode::from_repr)?.unwrap_or(Mode::Triangles),
	})
}

fn parse_mesh(mesh: &JsonObject) -> Result<Mesh, GltfError> {
	Ok(Mesh {
		name: mesh.name()?,
		primitives: mesh.req_objects("primitives")?.iter().map(parse_primitive).collect::<Result<Vec<_>, _>>()?,
	})
}

fn parse_node(node: &JsonObject) -> Result<Node, GltfError> {
	Ok(Node {
		name: node.name()?,
		camera: node.index("camera")?,
		skin: node.index("skin")?,
		meshes: node.index("mesh")?.into_iter().collect(),
		children: node.indices("children")?,
		transform: Some(parse_transform(node)?),
	})
}

/// Reads a textureInfo object, returning the texture index.
fn parse_texture_info(info: &JsonObject) -> Result<usize, GltfError> {
	info.index("texCoord")?;
	info.req_index("index")
}

fn parse_material(material: &JsonObject) -> Result<Material, GltfError> {
	let mut pbr = PbrMaterial::default();
	if let Some(metallic_roughness) = material.object("pbrMetallicRoughness")? {
		if let Some(factor) = metallic_roughness.floats::<4>("baseColorFactor")? {
			pbr.base_color_factor = factor;
		}
		if let Some(info) = metallic_roughness.object("baseColorTexture")? {
			pbr.base_color_texture = Some(parse_texture_info(&info)?);
		}
		if let Some(metallic) = metallic_roughness.number("metallicFactor")? {
			pbr.metallic_factor = metallic;
		}
		if let Some(roughness) = metallic_roughness.number("roughnessFactor")? {
			pbr.roughness_factor = roughness;
		}
		if let Some(info) = metallic_roughness.object("metallicRoughnessTexture")? {
			parse_texture_info(&info)?;
		}
	}
	if let Some(info) = material.object("normalTexture")? {
		parse_texture_info(&info)?;
		info.number("scale")?;
	}
	if let Some(info) = material.object("occlusionTexture")? {
		parse_texture_info(&info)?;
		info.number("strength")?;
	}
	if let Some(info) = material.object("emissiveTexture")? {
		parse_texture_info(&info)?;
	}
	if let Some(emissive) = material.floats::<3>("emissiveFactor")? {
		pbr.emissive_factor = emissive;
	}
	if let Some(mode) = material.str_enum("alphaMode", JsonKind::AlphaMode)? {
		pbr.alpha_mode = mode;
	}
	if let Some(cutoff) = material.number("alphaCutoff")? {
		pbr.alpha_cutoff = cutoff;
	}
	if let Some(double_sided) = material.boolean("doubleSided")? {
		pbr.double_sided = double_sided;
	}
	Ok(Material { name: material.name()?, shading: MaterialShading::Pbr(pbr) })
}

fn parse_image(image: &JsonObject, base_dir: &Path) -> Result<Image, GltfError> {
	let mime_type = image.string("mimeType")?.map(String::from);
	let source = match (image.string("uri")?, image.index("bufferView")?) {
		(_, Some(view)) => {
			if mime_type.is_none() {
				tracing::warn!("{} has no mimeType", image.field("bufferView"));
			}
			ImageSource::BufferView(view)
		},
		(Some(uri), None) => ImageSource::Path(resolve_uri(base_dir, uri)?),
		(None, None) => return Err(GltfError::SchemaViolation { field: image.field("uri"), expected: JsonKind::String }),
	};
	Ok(Image { name: image.name()?, source, mime_type })
}

/// Samplers read the same in both versions.
pub(crate) fn parse_sampler(sampler: &JsonObject) -> Result<Sampler, GltfError> {
	Ok(Sampler {
		mag_filter: sampler.code_enum("magFilter", Filter::from_repr)?,
		min_filter: sampler.code_enum("minFilter", Filter::from_repr)?,
		wrap_s: sampler.code_enum("wrapS", WrapMode::from_repr)?.unwrap_or(WrapMode::Repeat),
		wrap_t: sampler.code_enum("wrapT", WrapMode::from_repr)?.unwrap_or(WrapMode::Repeat),
	})
}

fn parse_texture(texture: &JsonObject) -> Result<Texture, GltfError> {
	Ok(Texture {
		sampler: texture.index("sampler")?,
		source: texture.index("source")?,
	})
}

fn parse_scene(scene: &JsonObject) -> Result<Scene, GltfError> {
	Ok(Scene { name: scene.name()?, nodes: scene.indices("nodes")? })
}

fn collect<T>(root: &JsonObject, key: &str, f: impl Fn(&JsonObject) -> Result<T, GltfError>) -> Result<Vec<T>, GltfError> {
	root.objects(key)?.iter().map(f).collect()
}

/// Reads a version 2 document. Buffers are loaded eagerly, images are only resolved to paths.
pub(crate) fn parse_v2(json: &serde_json::Value, base_dir: &Path, embedded: Option<&[u8]>) -> Result<Document, GltfError> {
	let root = JsonObject::root(json)?;
	let asset = parse_asset(&root)?;
	if !(asset.version.starts_with("2.") || asset.version == "2") {
		return Err(GltfError::UnsupportedVersion(asset.version));
	}
	if asset.version != "2.0" {
		tracing::warn!("asset version {} is not 2.0, reading it as 2.0", asset.version);
	}

	let scenes = collect(&root, "scenes", parse_scene)?;
	let scene = match root.index("scene")? {
		Some(scene) => Some(scene),
		None if !scenes.is_empty() => Some(0),
		None => None,
	};

	Ok(Document {
		version: Version::V2,
		asset,
		base_dir: base_dir.to_path_buf(),
		scene,
		scenes,
		nodes: collect(&root, "nodes", parse_node)?,
		meshes: collect(&root, "meshes", parse_mesh)?,
		materials: collect(&root, "materials", parse_material)?,
		textures: collect(&root, "textures", parse_texture)?,
		images: collect(&root, "images", |image| parse_image(image, base_dir))?,
		samplers: collect(&root, "samplers", parse_sampler)?,
		accessors: collect(&root, "accessors", parse_accessor)?,
		buffer_views: collect(&root, "bufferViews", parse_buffer_view)?,
		buffers: parse_buffers(&root, base_dir, embedded)?,
	})
}
