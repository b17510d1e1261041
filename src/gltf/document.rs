use std::path::PathBuf;

use rustc_hash::FxHashMap;
use strum_macros::{Display, EnumString, FromRepr};

use crate::math::Transform;

use super::GltfError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
	V1,
	V2,
}

#[derive(Clone, Debug, Default)]
pub struct AssetInfo {
	pub version: String,
	pub generator: Option<String>,
	pub copyright: Option<String>,
	pub min_version: Option<String>,
}

#[derive(Debug)]
pub struct Buffer {
	pub name: Option<String>,
	/// File the bytes were read from, if any.
	pub source: Option<PathBuf>,
	pub data: Vec<u8>,
}

impl Buffer {
	pub fn byte_length(&self) -> usize {
		self.data.len()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum BufferTarget {
	ArrayBuffer = 34962,
	ElementArrayBuffer = 34963,
}

#[derive(Clone, Debug)]
pub struct BufferView {
	pub buffer: usize,
	pub byte_offset: usize,
	pub byte_length: usize,
	pub byte_stride: Option<usize>,
	pub target: Option<BufferTarget>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr, Display)]
#[repr(u32)]
pub enum ComponentType {
	I8 = 5120,
	U8 = 5121,
	I16 = 5122,
	U16 = 5123,
	I32 = 5124,
	U32 = 5125,
	F32 = 5126,
}

impl ComponentType {
	pub fn byte_size(self) -> usize {
		match self {
			ComponentType::I8 | ComponentType::U8 => 1,
			ComponentType::I16 | ComponentType::U16 => 2,
			ComponentType::I32 | ComponentType::U32 | ComponentType::F32 => 4,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
pub enum AccessorType {
	#[strum(serialize = "SCALAR")]
	Scalar,
	#[strum(serialize = "VEC2")]
	Vec2,
	#[strum(serialize = "VEC3")]
	Vec3,
	#[strum(serialize = "VEC4")]
	Vec4,
	#[strum(serialize = "MAT2")]
	Mat2,
	#[strum(serialize = "MAT3")]
	Mat3,
	#[strum(serialize = "MAT4")]
	Mat4,
}

impl AccessorType {
	pub fn component_count(self) -> usize {
		match self {
			AccessorType::Scalar => 1,
			AccessorType::Vec2 => 2,
			AccessorType::Vec3 => 3,
			AccessorType::Vec4 | AccessorType::Mat2 => 4,
			AccessorType::Mat3 => 9,
			AccessorType::Mat4 => 16,
		}
	}
}

#[derive(Clone, Debug)]
pub struct Accessor {
	/// `None` means every element is zero.
	pub buffer_view: Option<usize>,
	pub byte_offset: usize,
	/// Per-accessor stride, only present in version 1 documents.
	pub byte_stride: Option<usize>,
	/// Raw glTF component type code; see [`Accessor::component_type`].
	pub component_type: u32,
	pub ty: AccessorType,
	pub count: usize,
	pub normalized: bool,
}

impl Accessor {
	pub fn component_type(&self) -> Option<ComponentType> {
		ComponentType::from_repr(self.component_type)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum WrapMode {
	ClampToEdge = 33071,
	MirroredRepeat = 33648,
	Repeat = 10497,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(u32)]
pub enum Filter {
	Nearest = 9728,
	Linear = 9729,
	NearestMipmapNearest = 9984,
	LinearMipmapNearest = 9985,
	NearestMipmapLinear = 9986,
	LinearMipmapLinear = 9987,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sampler {
	pub mag_filter: Option<Filter>,
	pub min_filter: Option<Filter>,
	pub wrap_s: WrapMode,
	pub wrap_t: WrapMode,
}

impl Default for Sampler {
	fn default() -> Self {
		Self { mag_filter: None, min_filter: None, wrap_s: WrapMode::Repeat, wrap_t: WrapMode::Repeat }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
	/// Already resolved against the document's base directory.
	Path(PathBuf),
	BufferView(usize),
}

#[derive(Clone, Debug)]
pub struct Image {
	pub name: Option<String>,
	pub source: ImageSource,
	pub mime_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Texture {
	pub sampler: Option<usize>,
	pub source: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Display)]
pub enum AlphaMode {
	#[default]
	#[strum(serialize = "OPAQUE")]
	Opaque,
	#[strum(serialize = "MASK")]
	Mask,
	#[strum(serialize = "BLEND")]
	Blend,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PbrMaterial {
	pub base_color_factor: [f32; 4],
	pub base_color_texture: Option<usize>,
	pub metallic_factor: f32,
	pub roughness_factor: f32,
	pub emissive_factor: [f32; 3],
	pub alpha_mode: AlphaMode,
	pub alpha_cutoff: f32,
	pub double_sided: bool,
}

impl Default for PbrMaterial {
	fn default() -> Self {
		Self {
			base_color_factor: [1.0; 4],
			base_color_texture: None,
			metallic_factor: 1.0,
			roughness_factor: 1.0,
			emissive_factor: [0.0; 3],
			alpha_mode: AlphaMode::Opaque,
			alpha_cutoff: 0.5,
			double_sided: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum MaterialShading {
	/// Version 1: the technique's shader annotation, if the technique carries one.
	Technique(Option<String>),
	/// Version 2 metallic-roughness parameters.
	Pbr(PbrMaterial),
}

#[derive(Clone, Debug)]
pub struct Material {
	pub name: Option<String>,
	pub shading: MaterialShading,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr, Display)]
#[repr(u32)]
pub enum Mode {
	Points = 0,
	Lines = 1,
	LineLoop = 2,
	LineStrip = 3,
	Triangles = 4,
	TriangleStrip = 5,
	TriangleFan = 6,
}

#[derive(Clone, Debug)]
pub struct Primitive {
	pub attributes: FxHashMap<String, usize>,
	pub indices: Option<usize>,
	pub material: Option<usize>,
	pub mode: Mode,
}

impl Primitive {
	pub fn attribute(&self, semantic: &str) -> Option<usize> {
		self.attributes.get(semantic).copied()
	}
}

#[derive(Clone, Debug)]
pub struct Mesh {
	pub name: Option<String>,
	pub primitives: Vec<Primitive>,
}

#[derive(Clone, Debug)]
pub struct Node {
	pub name: Option<String>,
	pub camera: Option<usize>,
	pub skin: Option<usize>,
	/// Version 1 nodes may reference several meshes, version 2 nodes at most one.
	pub meshes: Vec<usize>,
	pub children: Vec<usize>,
	/// `None` when the node's transform was skipped.
	pub transform: Option<Transform>,
}

#[derive(Clone, Debug)]
pub struct Scene {
	pub name: Option<String>,
	pub nodes: Vec<usize>,
}

/// A glTF asset normalized into one shape regardless of the schema version it came from.
///
/// All cross references are indices into the collections owned here. The document is
/// built once by an adapter and never mutated afterwards.
#[derive(Debug)]
pub struct Document {
	pub version: Version,
	pub asset: AssetInfo,
	pub base_dir: PathBuf,
	pub scene: Option<usize>,
	pub scenes: Vec<Scene>,
	pub nodes: Vec<Node>,
	pub meshes: Vec<Mesh>,
	pub materials: Vec<Material>,
	pub textures: Vec<Texture>,
	pub images: Vec<Image>,
	pub samplers: Vec<Sampler>,
	pub accessors: Vec<Accessor>,
	pub buffer_views: Vec<BufferView>,
	pub buffers: Vec<Buffer>,
}

fn lookup<'a, T>(data: &'a [T], i: usize, field: &str) -> Result<&'a T, GltfError> {
	data.get(i).ok_or_else(|| GltfError::InvalidReference { field: field.to_string(), index: i })
}

impl Document {
	pub fn node(&self, i: usize) -> Result<&Node, GltfError> {
		lookup(&self.nodes, i, "nodes")
	}

	pub fn mesh(&self, i: usize) -> Result<&Mesh, GltfError> {
		lookup(&self.meshes, i, "meshes")
	}

	pub fn material(&self, i: usize) -> Result<&Material, GltfError> {
		lookup(&self.materials, i, "materials")
	}

	pub fn texture(&self, i: usize) -> Result<&Texture, GltfError> {
		lookup(&self.textures, i, "textures")
	}

	pub fn image(&self, i: usize) -> Result<&Image, GltfError> {
		lookup(&self.images, i, "images")
	}

	pub fn sampler(&self, i: usize) -> Result<&Sampler, GltfError> {
		lookup(&self.samplers, i, "samplers")
	}

	pub fn accessor(&self, i: usize) -> Result<&Accessor, GltfError> {
		lookup(&self.accessors, i, "accessors")
	}

	pub fn buffer_view(&self, i: usize) -> Result<&BufferView, GltfError> {
		lookup(&self.buffer_views, i, "bufferViews")
	}

	pub fn buffer(&self, i: usize) -> Result<&Buffer, GltfError> {
		lookup(&self.buffers, i, "buffers")
	}

	/// Bytes covered by a buffer view, bounds checked against its buffer.
	pub fn view_bytes(&self, i: usize) -> Result<&[u8], GltfError> {
		let view = self.buffer_view(i)?;
		let buffer = self.buffer(view.buffer)?;
		let end = view.byte_offset.checked_add(view.byte_length);
		end.and_then(|end| buffer.data.get(view.byte_offset..end)).ok_or(GltfError::OutOfRange {
			what: format!("bufferViews[{i}]"),
			needed: view.byte_offset.saturating_add(view.byte_length),
			available: buffer.byte_length(),
		})
	}

	/// Checks every index reference so traversal and decoding only ever see dangling
	/// references through a hand-built document.
	pub(crate) fn validate(&self) -> Result<(), GltfError> {
		fn check<T>(data: &[T], i: usize, field: impl FnOnce() -> String) -> Result<(), GltfError> {
			if i < data.len() {
				Ok(())
			} else {
				Err(GltfError::InvalidReference { field: field(), index: i })
			}
		}
		if let Some(scene) = self.scene {
			check(&self.scenes, scene, || "scene".into())?;
		}
		for (i, scene) in self.scenes.iter().enumerate() {
			for &n in &scene.nodes {
				check(&self.nodes, n, || format!("scenes[{i}].nodes"))?;
			}
		}
		for (i, node) in self.nodes.iter().enumerate() {
			for &c in &node.children {
				check(&self.nodes, c, || format!("nodes[{i}].children"))?;
			}
			for &m in &node.meshes {
				check(&self.meshes, m, || format!("nodes[{i}].mesh"))?;
			}
		}
		for (i, mesh) in self.meshes.iter().enumerate() {
			for (j, primitive) in mesh.primitives.iter().enumerate() {
				for (semantic, &a) in &primitive.attributes {
					check(&self.accessors, a, || format!("meshes[{i}].primitives[{j}].attributes.{semantic}"))?;
				}
				if let Some(a) = primitive.indices {
					check(&self.accessors, a, || format!("meshes[{i}].primitives[{j}].indices"))?;
				}
				if let Some(m) = primitive.material {
					check(&self.materials, m, || format!("meshes[{i}].primitives[{j}].material"))?;
				}
			}
		}
		for (i, material) in self.materials.iter().enumerate() {
			if let MaterialShading::Pbr(PbrMaterial { base_color_texture: Some(t), .. }) = &material.shading {
				check(&self.textures, *t, || format!("materials[{i}].pbrMetallicRoughness.baseColorTexture"))?;
			}
		}
		for (i, texture) in self.textures.iter().enumerate() {
			if let Some(s) = texture.source {
				check(&self.images, s, || format!("textures[{i}].source"))?;
			}
			if let Some(s) = texture.sampler {
				check(&self.samplers, s, || format!("textures[{i}].sampler"))?;
			}
		}
		for (i, image) in self.images.iter().enumerate() {
			if let ImageSource::BufferView(v) = image.source {
				check(&self.buffer_views, v, || format!("images[{i}].bufferView"))?;
			}
		}
		for (i, accessor) in self.accessors.iter().enumerate() {
			if let Some(v) = accessor.buffer_view {
				check(&self.buffer_views, v, || format!("accessors[{i}].bufferView"))?;
			}
		}
		for (i, view) in self.buffer_views.iter().enumerate() {
			check(&self.buffers, view.buffer, || format!("bufferViews[{i}].buffer"))?;
			self.view_bytes(i)?;
		}
		Ok(())
	}
}
