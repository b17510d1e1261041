use std::path::Path;

use polyscene::gltf::{self, Archetype, GltfError, TextureSource, Version};
use polyscene::math::Vec3;
use polyscene::ImportConfig;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};

const PAPER: &str = "https://vr.google.com/shaders/w/gvrss/paper.json";

fn positions() -> Vec<u8> {
	[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0].iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Three VEC3 float positions followed by three u16 indices.
fn triangle_bin() -> Vec<u8> {
	let mut data = positions();
	for i in [0u16, 1, 2] {
		data.extend_from_slice(&i.to_le_bytes());
	}
	data
}

fn write(dir: &Path, name: &str, bytes: &[u8]) {
	std::fs::write(dir.join(name), bytes).unwrap();
}

fn write_json(dir: &Path, name: &str, json: &Value) {
	write(dir, name, serde_json::to_string_pretty(json).unwrap().as_bytes());
}

fn triangle_v2(buffer: Value, indexed: bool) -> Value {
	let mut primitive = json!({ "attributes": { "POSITION": 0 } });
	if indexed {
		primitive["indices"] = json!(1);
	}
	json!({
		"asset": { "version": "2.0", "generator": "hand written" },
		"buffers": [buffer],
		"bufferViews": [
			{ "buffer": 0, "byteLength": 36, "target": 34962 },
			{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 },
		],
		"accessors": [
			{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
			{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
		],
		"meshes": [{ "primitives": [primitive] }],
		"nodes": [{ "name": "triangle", "mesh": 0 }],
		"scenes": [{ "nodes": [0] }],
	})
}

fn setup_v2(indexed: bool) -> TempDir {
	let dir = tempdir().unwrap();
	write(dir.path(), "triangle.bin", &triangle_bin());
	write_json(dir.path(), "triangle.gltf", &triangle_v2(json!({ "uri": "triangle.bin", "byteLength": 42 }), indexed));
	dir
}

#[test]
fn v2_indexed_triangle() {
	let dir = setup_v2(true);
	let doc = gltf::load(dir.path().join("triangle.gltf")).unwrap();
	assert_eq!(doc.version, Version::V2);
	assert_eq!(doc.asset.generator.as_deref(), Some("hand written"));
	assert_eq!(doc.buffers[0].source.as_deref(), Some(dir.path().join("triangle.bin").as_path()));

	let tree = doc.materialize_default(&ImportConfig::default()).unwrap();
	assert!(tree.is_complete());
	assert_eq!(tree.geometry_count(), 1);
	let root = &tree.roots[0];
	assert_eq!(root.name.as_deref(), Some("triangle"));
	let geometry = &root.geometry[0];
	assert_eq!(geometry.positions, vec![
		Vec3::new(-300.0, 100.0, 200.0),
		Vec3::new(-600.0, 400.0, 500.0),
		Vec3::new(-900.0, 700.0, 800.0),
	]);
	assert_eq!(geometry.indices, Some(vec![0, 1, 2]));
	assert_eq!(geometry.triangle_count(), 1);
	assert_eq!(geometry.material.archetype, Archetype::Unlit);
}

#[test]
fn v2_non_indexed_triangle() {
	let dir = setup_v2(false);
	let tree = gltf::load(dir.path().join("triangle.gltf")).unwrap().materialize(0).unwrap();
	let geometry = &tree.roots[0].geometry[0];
	assert_eq!(geometry.indices, None);
	assert_eq!(geometry.vertex_count(), 3);
	assert_eq!(geometry.triangle_count(), 1);
}

#[test]
fn buffer_length_must_match() {
	let dir = tempdir().unwrap();
	write(dir.path(), "triangle.bin", &triangle_bin());
	write_json(dir.path(), "triangle.gltf", &triangle_v2(json!({ "uri": "triangle.bin", "byteLength": 48 }), true));
	match gltf::load(dir.path().join("triangle.gltf")) {
		Err(GltfError::BufferLength { buffer, declared, actual }) => {
			assert_eq!((buffer, declared, actual), (0, 48, 42));
		},
		other => panic!("expected buffer length error, got {other:?}"),
	}
}

#[test]
fn buffer_outside_base_dir_is_rejected() {
	let dir = tempdir().unwrap();
	write_json(dir.path(), "triangle.gltf", &triangle_v2(json!({ "uri": "../triangle.bin", "byteLength": 42 }), true));
	assert!(matches!(gltf::load(dir.path().join("triangle.gltf")), Err(GltfError::ParentDirURI(_))));
}

#[test]
fn dangling_reference_fails_parse() {
	let dir = setup_v2(true);
	let mut json = triangle_v2(json!({ "uri": "triangle.bin", "byteLength": 42 }), true);
	json["nodes"][0]["mesh"] = json!(3);
	let r = gltf::parse(&json, dir.path(), None);
	match r {
		Err(GltfError::InvalidReference { field, index }) => {
			assert_eq!(field, "nodes[0].mesh");
			assert_eq!(index, 3);
		},
		other => panic!("expected invalid reference, got {other:?}"),
	}
}

#[test]
fn view_past_buffer_end_fails_parse() {
	let dir = setup_v2(true);
	let mut json = triangle_v2(json!({ "uri": "triangle.bin", "byteLength": 42 }), true);
	json["bufferViews"][1]["byteLength"] = json!(8);
	assert!(matches!(gltf::parse(&json, dir.path(), None), Err(GltfError::OutOfRange { .. })));
}

#[test]
fn textured_material_points_at_image_file() {
	let dir = setup_v2(true);
	let mut json = triangle_v2(json!({ "uri": "triangle.bin", "byteLength": 42 }), true);
	json["meshes"][0]["primitives"][0]["material"] = json!(0);
	json["materials"] = json!([{
		"pbrMetallicRoughness": { "baseColorTexture": { "index": 0 }, "roughnessFactor": 0.3 },
	}]);
	json["textures"] = json!([{ "source": 0, "sampler": 0 }]);
	json["samplers"] = json!([{ "wrapS": 33071 }]);
	json["images"] = json!([{ "uri": "textures/wood.png", "mimeType": "image/png" }]);

	let doc = gltf::parse(&json, dir.path(), None).unwrap();
	let tree = doc.materialize(0).unwrap();
	let material = &tree.roots[0].geometry[0].material;
	assert_eq!(material.archetype, Archetype::Pbr);
	assert_eq!(material.roughness, 0.3);
	let texture = material.base_color_texture.as_ref().unwrap();
	assert_eq!(texture.source, TextureSource::Path(dir.path().join("textures/wood.png")));
	assert_eq!(texture.mime_type.as_deref(), Some("image/png"));
}

fn glb(json: &Value, bin: &[u8]) -> Vec<u8> {
	let mut json = serde_json::to_vec(json).unwrap();
	while json.len() % 4 != 0 {
		json.push(b' ');
	}
	let mut bin = bin.to_vec();
	while bin.len() % 4 != 0 {
		bin.push(0);
	}
	let mut out = Vec::new();
	out.extend_from_slice(b"glTF");
	out.extend_from_slice(&2u32.to_le_bytes());
	out.extend_from_slice(&((12 + 8 + json.len() + 8 + bin.len()) as u32).to_le_bytes());
	out.extend_from_slice(&(json.len() as u32).to_le_bytes());
	out.extend_from_slice(b"JSON");
	out.extend_from_slice(&json);
	out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
	out.extend_from_slice(b"BIN\0");
	out.extend_from_slice(&bin);
	out
}

#[test]
fn glb_uses_embedded_buffer() {
	let dir = tempdir().unwrap();
	let json = triangle_v2(json!({ "byteLength": 42 }), true);
	write(dir.path(), "triangle.glb", &glb(&json, &triangle_bin()));

	let doc = gltf::load(dir.path().join("triangle.glb")).unwrap();
	assert_eq!(doc.buffers[0].source, None);
	assert_eq!(doc.buffers[0].byte_length(), 42);
	let tree = doc.materialize(0).unwrap();
	assert_eq!(tree.roots[0].geometry[0].indices, Some(vec![0, 1, 2]));
}

fn triangle_v1() -> Value {
	json!({
		"asset": { "version": "1.0" },
		"scene": "defaultScene",
		"scenes": { "defaultScene": { "nodes": ["root"] } },
		"nodes": {
			"root": {
				"meshes": ["mesh"],
				"translation": [1, 0, 0],
				"rotation": [0, 0, 0, 1],
				"scale": [1, 1, 1],
			},
		},
		"meshes": {
			"mesh": {
				"primitives": [
					{ "attributes": { "POSITION": "positions" }, "indices": "indices", "material": "paper", "mode": 4 },
					{ "attributes": { "POSITION": "positions" }, "material": "toon", "mode": 4 },
					{ "attributes": { "POSITION": "positions" }, "mode": 0 },
				],
			},
		},
		"accessors": {
			"positions": { "bufferView": "vertices", "byteOffset": 0, "byteStride": 12, "componentType": 5126, "count": 3, "type": "VEC3" },
			"indices": { "bufferView": "elements", "byteOffset": 0, "componentType": 5123, "count": 3, "type": "SCALAR" },
		},
		"bufferViews": {
			"vertices": { "buffer": "data", "byteOffset": 0, "byteLength": 36, "target": 34962 },
			"elements": { "buffer": "data", "byteOffset": 36, "byteLength": 6, "target": 34963 },
		},
		"buffers": { "data": { "uri": "triangle.bin", "byteLength": 42 } },
		"materials": {
			"paper": { "technique": "paperTechnique" },
			"toon": { "technique": "toonTechnique" },
		},
		"techniques": {
			"paperTechnique": { "extras": { "gvrss": PAPER } },
			"toonTechnique": { "extras": { "gvrss": "https://example.com/shaders/toon.json" } },
		},
	})
}

#[test]
fn v1_document_materializes() {
	let dir = tempdir().unwrap();
	write(dir.path(), "triangle.bin", &triangle_bin());
	write_json(dir.path(), "triangle.gltf", &triangle_v1());

	let doc = gltf::load(dir.path().join("triangle.gltf")).unwrap();
	assert_eq!(doc.version, Version::V1);
	let tree = doc.materialize_default(&ImportConfig::default()).unwrap();
	assert_eq!(tree.geometry_count(), 2);
	assert_eq!(tree.warnings.len(), 1);

	let root = &tree.roots[0];
	assert_eq!(root.local.translation, Vec3::new(1.0, 0.0, 0.0));
	assert_eq!(root.geometry[0].material.archetype, Archetype::Paper);
	assert_eq!(root.geometry[0].triangle_count(), 1);
	// unrecognized techniques never fall back to paper
	assert_eq!(root.geometry[1].material.archetype, Archetype::None);
	assert_eq!(root.geometry[1].positions, root.geometry[0].positions);
}

#[test]
fn v1_unknown_id_fails_parse() {
	let dir = tempdir().unwrap();
	write(dir.path(), "triangle.bin", &triangle_bin());
	let mut json = triangle_v1();
	json["scenes"]["defaultScene"]["nodes"] = json!(["missing"]);
	match gltf::parse(&json, dir.path(), None) {
		Err(GltfError::UnknownId { field, id }) => {
			assert_eq!(field, "scenes.defaultScene.nodes[0]");
			assert_eq!(id, "missing");
		},
		other => panic!("expected unknown id, got {other:?}"),
	}
}

#[test]
fn config_file_selects_scene() {
	let dir = setup_v2(true);
	write(dir.path(), "import.ron", b"(max_depth: 8, scene: Some(0))");
	let config = ImportConfig::load(dir.path().join("import.ron")).unwrap();
	assert_eq!(config.max_depth, 8);
	let doc = gltf::load(dir.path().join("triangle.gltf")).unwrap();
	assert_eq!(doc.materialize_default(&config).unwrap().scene, 0);
}
