use std::path::Path;

use rustc_hash::FxHashMap;

use crate::math::{Quat, Transform, Vec3};

use super::json::{JsonKind, JsonObject};
use super::v2::parse_sampler;
use super::*;

type Ids<'a> = FxHashMap<&'a str, usize>;

fn ids<'a>(items: &[(&'a str, JsonObject<'a>)]) -> Ids<'a> {
	items.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect()
}

/// Version 1 objects reference each other by string id. This turns one into an index.
fn lookup(ids: &Ids, field: String, id: &str) -> Result<usize, GltfError> {
	ids.get(id).copied().ok_or_else(|| GltfError::UnknownId { field, id: id.to_string() })
}

fn id_ref(ids: &Ids, obj: &JsonObject, key: &str) -> Result<Option<usize>, GltfError> {
	match obj.string(key)? {
		Some(id) => lookup(ids, obj.field(key), id).map(Some),
		None => Ok(None),
	}
}

fn req_id_ref(ids: &Ids, obj: &JsonObject, key: &str) -> Result<usize, GltfError> {
	lookup(ids, obj.field(key), obj.req_string(key)?)
}

fn id_refs(ids: &Ids, obj: &JsonObject, key: &str) -> Result<Vec<usize>, GltfError> {
	obj.strings(key)?.into_iter().enumerate()
		.map(|(i, id)| lookup(ids, format!("{}[{}]", obj.field(key), i), id))
		.collect()
}

/// Node transform for version 1: translation, rotation and scale are only honored
/// together. A matrix is used when none of them are given.
fn parse_transform(node: &JsonObject) -> Result<Option<Transform>, GltfError> {
	let translation = node.floats::<3>("translation")?;
	let rotation = node.floats::<4>("rotation")?;
	let scale = node.floats::<3>("scale")?;
	Ok(match (translation, rotation, scale) {
		(Some(t), Some(r), Some(s)) => Some(Transform::new(Vec3::from(t), Quat::from_array(r), Vec3::from(s))),
		(None, None, None) => match node.floats::<16>("matrix")? {
			Some(m) => Some(Transform::from_cols_slice(&m)),
			None => Some(Transform::IDENTITY),
		},
		_ => {
			tracing::warn!("{} has an incomplete translation/rotation/scale, ignoring its transform", node.path());
			None
		},
	})
}

fn guess_mime_type(uri: &str) -> Option<String> {
	let ext = Path::new(uri).extension()?.to_str()?.to_ascii_lowercase();
	match ext.as_str() {
		"png" => Some(String::from("image/png")),
		"jpg" | "jpeg" => Some(String::from("image/jpeg")),
		_ => None,
	}
}

/// Reads the shader annotation a technique carries in its extras, if any.
fn technique_annotation(technique: &JsonObject) -> Result<Option<String>, GltfError> {
	Ok(match technique.object("extras")? {
		Some(extras) => extras.string("gvrss")?.map(String::from),
		None => None,
	})
}

/// Reads a version 1 document, translating every string id into an index.
pub(crate) fn parse_v1(json: &serde_json::Value, base_dir: &Path) -> Result<Document, GltfError> {
	let root = JsonObject::root(json)?;
	let asset = match root.object("asset")? {
		Some(asset) => AssetInfo {
			version: asset.string("version")?.unwrap_or("1.0").to_string(),
			generator: asset.string("generator")?.map(String::from),
			copyright: asset.string("copyright")?.map(String::from),
			min_version: None,
		},
		None => AssetInfo { version: String::from("1.0"), ..Default::default() },
	};

	let buffers = root.keyed_objects("buffers")?;
	let buffer_views = root.keyed_objects("bufferViews")?;
	let accessors = root.keyed_objects("accessors")?;
	let meshes = root.keyed_objects("meshes")?;
	let nodes = root.keyed_objects("nodes")?;
	let scenes = root.keyed_objects("scenes")?;
	let materials = root.keyed_objects("materials")?;
	let techniques = root.keyed_objects("techniques")?;
	let textures = root.keyed_objects("textures")?;
	let images = root.keyed_objects("images")?;
	let samplers = root.keyed_objects("samplers")?;
	let cameras = root.keyed_objects("cameras")?;
	let skins = root.keyed_objects("skins")?;

	let buffer_ids = ids(&buffers);
	let view_ids = ids(&buffer_views);
	let accessor_ids = ids(&accessors);
	let mesh_ids = ids(&meshes);
	let node_ids = ids(&nodes);
	let scene_ids = ids(&scenes);
	let material_ids = ids(&materials);
	let technique_ids = ids(&techniques);
	let image_ids = ids(&images);
	let sampler_ids = ids(&samplers);
	let camera_ids = ids(&cameras);
	let skin_ids = ids(&skins);

	let mut doc_buffers = Vec::new();
	for (i, (_, buffer)) in buffers.iter().enumerate() {
		let path = resolve_uri(base_dir, buffer.req_string("uri")?)?;
		// byteLength is optional in version 1, the file then defines it
		let data = match buffer.index("byteLength")? {
			Some(declared) => read_buffer_file(&path, i, declared)?,
			None => std::fs::read(&path)?,
		};
		doc_buffers.push(Buffer { name: buffer.name()?, source: Some(path), data });
	}

	let doc_views = buffer_views.iter().map(|(_, view)| -> Result<_, GltfError> { Ok(BufferView {
		buffer: req_id_ref(&buffer_ids, view, "buffer")?,
		byte_offset: view.req_index("byteOffset")?,
		byte_length: view.req_index("byteLength")?,
		byte_stride: None,
		target: view.code_enum("target", BufferTarget::from_repr)?,
	}) }).collect::<Result<Vec<_>, GltfError>>()?;

	let doc_accessors = accessors.iter().map(|(_, accessor)| -> Result<_, GltfError> { Ok(Accessor {
		buffer_view: Some(req_id_ref(&view_ids, accessor, "bufferView")?),
		byte_offset: accessor.req_index("byteOffset")?,
		byte_stride: accessor.index("byteStride")?,
		component_type: accessor.req_code("componentType")?,
		ty: accessor.req_str_enum("type", JsonKind::AccessorType)?,
		count: accessor.req_index("count")?,
		normalized: false,
	}) }).collect::<Result<Vec<_>, GltfError>>()?;

	let mut doc_meshes = Vec::new();
	for (_, mesh) in &meshes {
		let mut primitives = Vec::new();
		for primitive in mesh.objects("primitives")? {
			let semantics = primitive.req_object("attributes")?;
			let attributes = primitive.string_map("attributes")?.into_iter()
				.map(|(semantic, id)| Ok::<_, GltfError>((semantic.to_string(), lookup(&accessor_ids, semantics.field(semantic), id)?)))
				.collect::<Result<FxHashMap<_, _>, GltfError>>()?;
			primitives.push(Primitive {
				attributes,
				indices: id_ref(&accessor_ids, &primitive, "indices")?,
				material: id_ref(&material_ids, &primitive, "material")?,
				mode: primitive.code_enum("mode", Mode::from_repr)?.unwrap_or(Mode::Triangles),
			});
		}
		doc_meshes.push(Mesh { name: mesh.name()?, primitives });
	}

	let doc_nodes = nodes.iter().map(|(_, node)| -> Result<_, GltfError> { Ok(Node {
		name: node.name()?,
		camera: id_ref(&camera_ids, node, "camera")?,
		skin: id_ref(&skin_ids, node, "skin")?,
		meshes: id_refs(&mesh_ids, node, "meshes")?,
		children: id_refs(&node_ids, node, "children")?,
		transform: parse_transform(node)?,
	}) }).collect::<Result<Vec<_>, GltfError>>()?;

	let doc_scenes = scenes.iter().map(|(_, scene)| -> Result<_, GltfError> { Ok(Scene {
		name: scene.name()?,
		nodes: id_refs(&node_ids, scene, "nodes")?,
	}) }).collect::<Result<Vec<_>, GltfError>>()?;

	let mut doc_materials = Vec::new();
	for (_, material) in &materials {
		let annotation = match id_ref(&technique_ids, material, "technique")? {
			Some(t) => technique_annotation(&techniques[t].1)?,
			None => None,
		};
		doc_materials.push(Material { name: material.name()?, shading: MaterialShading::Technique(annotation) });
	}

	let doc_images = images.iter().map(|(_, image)| -> Result<_, GltfError> {
		let uri = image.req_string("uri")?;
		Ok(Image {
			name: image.name()?,
			source: ImageSource::Path(resolve_uri(base_dir, uri)?),
			mime_type: guess_mime_type(uri),
		})
	}).collect::<Result<Vec<_>, GltfError>>()?;

	let doc_textures = textures.iter().map(|(_, texture)| -> Result<_, GltfError> { Ok(Texture {
		sampler: id_ref(&sampler_ids, texture, "sampler")?,
		source: id_ref(&image_ids, texture, "source")?,
	}) }).collect::<Result<Vec<_>, GltfError>>()?;

	let doc_samplers = samplers.iter().map(|(_, sampler)| parse_sampler(sampler)).collect::<Result<Vec<_>, _>>()?;

	Ok(Document {
		version: Version::V1,
		asset,
		base_dir: base_dir.to_path_buf(),
		scene: id_ref(&scene_ids, &root, "scene")?,
		scenes: doc_scenes,
		nodes: doc_nodes,
		meshes: doc_meshes,
		materials: doc_materials,
		textures: doc_textures,
		images: doc_images,
		samplers: doc_samplers,
		accessors: doc_accessors,
		buffer_views: doc_views,
		buffers: doc_buffers,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn parse(json: serde_json::Value) -> Result<Document, GltfError> {
		parse_v1(&json, Path::new(""))
	}

	#[test]
	fn ids_become_indices() {
		let doc = parse(json!({
			"scene": "main",
			"scenes": { "main": { "nodes": ["root"] } },
			"nodes": {
				"child": { "meshes": ["box"] },
				"root": { "children": ["child"] },
			},
			"meshes": { "box": { "primitives": [] } },
		})).unwrap();
		// ids are ordered by key
		assert_eq!(doc.scene, Some(0));
		assert_eq!(doc.scenes[0].nodes, vec![1]);
		assert_eq!(doc.nodes[1].children, vec![0]);
		assert_eq!(doc.nodes[0].meshes, vec![0]);
	}

	#[test]
	fn unknown_id_is_reported() {
		let r = parse(json!({
			"nodes": { "root": { "children": ["ghost"] } },
		}));
		match r {
			Err(GltfError::UnknownId { field, id }) => {
				assert_eq!(field, "nodes.root.children[0]");
				assert_eq!(id, "ghost");
			},
			other => panic!("expected unknown id, got {other:?}"),
		}
	}

	#[test]
	fn transform_needs_all_three_parts() {
		let doc = parse(json!({
			"nodes": {
				"a": { "translation": [1, 2, 3], "rotation": [0, 0, 0, 1], "scale": [1, 1, 1] },
				"b": { "translation": [1, 2, 3], "rotation": [0, 0, 0, 1] },
				"c": {},
				"d": { "matrix": [2,0,0,0, 0,2,0,0, 0,0,2,0, 0,0,0,1] },
			},
		})).unwrap();
		assert_eq!(doc.nodes[0].transform.unwrap().translation, Vec3::new(1.0, 2.0, 3.0));
		assert_eq!(doc.nodes[1].transform, None);
		assert!(doc.nodes[2].transform.unwrap().is_identity());
		assert!(doc.nodes[3].transform.unwrap().scale.abs_diff_eq(Vec3::splat(2.0), 1e-6));
	}

	#[test]
	fn technique_annotation_is_kept() {
		let doc = parse(json!({
			"techniques": {
				"paper": { "extras": { "gvrss": "https://vr.google.com/shaders/w/gvrss/paper.json" } },
				"plain": {},
			},
			"materials": {
				"m0": { "technique": "paper" },
				"m1": { "technique": "plain" },
				"m2": {},
			},
		})).unwrap();
		assert_eq!(
			doc.materials[0].shading,
			MaterialShading::Technique(Some(String::from("https://vr.google.com/shaders/w/gvrss/paper.json"))),
		);
		assert_eq!(doc.materials[1].shading, MaterialShading::Technique(None));
		assert_eq!(doc.materials[2].shading, MaterialShading::Technique(None));
	}

	#[test]
	fn accessor_requires_view() {
		let r = parse(json!({
			"accessors": { "a": { "byteOffset": 0, "componentType": 5126, "count": 1, "type": "VEC3" } },
		}));
		match r {
			Err(GltfError::SchemaViolation { field, expected }) => {
				assert_eq!(field, "accessors.a.bufferView");
				assert_eq!(expected, JsonKind::String);
			},
			other => panic!("expected schema violation, got {other:?}"),
		}
	}

	#[test]
	fn images_guess_mime_type() {
		let doc = parse_v1(&json!({
			"images": { "a": { "uri": "wood.PNG" }, "b": { "uri": "metal.jpeg" }, "c": { "uri": "x.ktx" } },
		}), Path::new("assets")).unwrap();
		assert_eq!(doc.images[0].mime_type.as_deref(), Some("image/png"));
		assert_eq!(doc.images[1].mime_type.as_deref(), Some("image/jpeg"));
		assert_eq!(doc.images[2].mime_type, None);
		assert_eq!(doc.images[0].source, ImageSource::Path(Path::new("assets/wood.PNG").to_path_buf()));
	}
}
