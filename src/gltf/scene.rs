use crate::config::ImportConfig;
use crate::math::{Mat4, Transform, U8Vec4, Vec2, Vec3};

use super::*;

/// A primitive that was skipped or only partly imported. Traversal continues past these.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveIssue {
	UnsupportedTopology { mesh: usize, primitive: usize, mode: Mode },
	MissingAttribute { mesh: usize, primitive: usize, semantic: &'static str },
}

/// Decoded vertex data for one triangle primitive, in engine space.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
	pub mesh: usize,
	pub primitive: usize,
	pub positions: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub colors: Vec<U8Vec4>,
	pub indices: Option<Vec<u32>>,
	pub material: ResolvedMaterial,
}

impl Geometry {
	pub fn vertex_count(&self) -> usize {
		self.positions.len()
	}

	pub fn triangle_count(&self) -> usize {
		match &self.indices {
			Some(indices) => indices.len() / 3,
			None => self.positions.len() / 3,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
	/// Index of the document node this was built from.
	pub node: usize,
	pub name: Option<String>,
	pub local: Transform,
	pub world: Mat4,
	pub geometry: Vec<Geometry>,
	pub children: Vec<SceneNode>,
}

impl Drop for SceneNode {
	// flatten the subtree first, deep hierarchies would otherwise drop recursively
	fn drop(&mut self) {
		let mut pending = std::mem::take(&mut self.children);
		while let Some(mut node) = pending.pop() {
			pending.append(&mut node.children);
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneTree {
	pub scene: usize,
	pub roots: Vec<SceneNode>,
	pub warnings: Vec<PrimitiveIssue>,
}

impl SceneTree {
	/// Walks every node depth first, parents before children and siblings in order.
	pub fn iter(&self) -> SceneNodes<'_> {
		SceneNodes { stack: self.roots.iter().rev().collect() }
	}

	pub fn geometry_count(&self) -> usize {
		self.iter().map(|n| n.geometry.len()).sum()
	}

	/// Whether every primitive was imported without issues.
	pub fn is_complete(&self) -> bool {
		self.warnings.is_empty()
	}
}

pub struct SceneNodes<'a> {
	stack: Vec<&'a SceneNode>,
}

impl<'a> Iterator for SceneNodes<'a> {
	type Item = &'a SceneNode;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}

struct Traversal<'a> {
	document: &'a Document,
	max_depth: usize,
	on_path: Vec<bool>,
	warnings: Vec<PrimitiveIssue>,
}

impl<'a> Traversal<'a> {
	fn issue(&mut self, issue: PrimitiveIssue) {
		tracing::warn!("skipping part of a primitive: {issue:?}");
		self.warnings.push(issue);
	}

	fn primitive(&mut self, mesh: usize, index: usize, primitive: &Primitive) -> Result<Option<Geometry>, GltfError> {
		if primitive.mode != Mode::Triangles {
			self.issue(PrimitiveIssue::UnsupportedTopology { mesh, primitive: index, mode: primitive.mode });
			return Ok(None);
		}
		let doc = self.document;
		let material = doc.resolve_material(primitive.material)?;
		let Some(positions) = primitive.attribute("POSITION") else {
			self.issue(PrimitiveIssue::MissingAttribute { mesh, primitive: index, semantic: "POSITION" });
			return Ok(Some(Geometry {
				mesh,
				primitive: index,
				positions: Vec::new(),
				normals: Vec::new(),
				uvs: Vec::new(),
				colors: Vec::new(),
				indices: None,
				material,
			}));
		};

		let colors = primitive.attribute("COLOR_0").or(primitive.attribute("COLOR"));
		Ok(Some(Geometry {
			mesh,
			primitive: index,
			positions: doc.decode_positions(positions)?,
			normals: primitive.attribute("NORMAL").map(|a| doc.decode_normals(a)).transpose()?.unwrap_or_default(),
			uvs: primitive.attribute("TEXCOORD_0").map(|a| doc.decode_uvs(a)).transpose()?.unwrap_or_default(),
			colors: colors.map(|a| doc.decode_colors(a)).transpose()?.unwrap_or_default(),
			indices: primitive.indices.map(|a| doc.decode_indices(a)).transpose()?,
			material,
		}))
	}

	/// Opens a frame for `index` below a parent with world matrix `parent`.
	fn enter(&mut self, index: usize, parent: Mat4, depth: usize) -> Result<Frame<'a>, GltfError> {
		if depth > self.max_depth {
			return Err(GltfError::DepthLimit { limit: self.max_depth });
		}
		let doc = self.document;
		let node = doc.node(index)?;
		if self.on_path[index] {
			return Err(GltfError::CyclicGraph { node: index });
		}
		let local = node.transform.unwrap_or_default();
		let world = parent * local.matrix();

		let mut geometry = Vec::new();
		for &m in &node.meshes {
			let mesh = doc.mesh(m)?;
			for (p, primitive) in mesh.primitives.iter().enumerate() {
				geometry.extend(self.primitive(m, p, primitive)?);
			}
		}

		self.on_path[index] = true;
		Ok(Frame { index, node, local, world, depth, cursor: 0, geometry, children: Vec::new() })
	}

	/// Builds the subtrees under `roots` with an explicit stack, so hierarchy depth is
	/// bounded by `max_depth` and not by the thread's stack.
	fn roots(&mut self, roots: &[usize]) -> Result<Vec<SceneNode>, GltfError> {
		let mut built = Vec::with_capacity(roots.len());
		for &root in roots {
			let mut stack = vec![self.enter(root, Mat4::IDENTITY, 1)?];
			while let Some(mut frame) = stack.pop() {
				if let Some(&child) = frame.node.children.get(frame.cursor) {
					frame.cursor += 1;
					let next = self.enter(child, frame.world, frame.depth + 1)?;
					stack.push(frame);
					stack.push(next);
					continue;
				}
				self.on_path[frame.index] = false;
				let node = frame.finish();
				match stack.last_mut() {
					Some(parent) => parent.children.push(node),
					None => built.push(node),
				}
			}
		}
		Ok(built)
	}
}

/// A node whose children are still being built.
struct Frame<'a> {
	index: usize,
	node: &'a Node,
	local: Transform,
	world: Mat4,
	depth: usize,
	/// Next child to visit.
	cursor: usize,
	geometry: Vec<Geometry>,
	children: Vec<SceneNode>,
}

impl Frame<'_> {
	fn finish(self) -> SceneNode {
		SceneNode {
			node: self.index,
			name: self.node.name.clone(),
			local: self.local,
			world: self.world,
			geometry: self.geometry,
			children: self.children,
		}
	}
}

impl Document {
	/// Builds the node hierarchy of a scene with decoded geometry and resolved materials.
	pub fn materialize(&self, scene: usize) -> Result<SceneTree, GltfError> {
		self.materialize_with(scene, &ImportConfig::default())
	}

	pub fn materialize_with(&self, scene: usize, config: &ImportConfig) -> Result<SceneTree, GltfError> {
		let roots = &self.scenes.get(scene)
			.ok_or_else(|| GltfError::InvalidReference { field: String::from("scenes"), index: scene })?
			.nodes;
		let mut traversal = Traversal {
			document: self,
			max_depth: config.max_depth,
			on_path: vec![false; self.nodes.len()],
			warnings: Vec::new(),
		};
		let roots = traversal.roots(roots)?;
		let tree = SceneTree { scene, roots, warnings: traversal.warnings };
		tracing::debug!(
			"materialized scene {}: {} nodes, {} geometries, {} skipped",
			scene, tree.iter().count(), tree.geometry_count(), tree.warnings.len(),
		);
		Ok(tree)
	}

	/// Materializes the scene picked by `config`, falling back to the document's default scene.
	pub fn materialize_default(&self, config: &ImportConfig) -> Result<SceneTree, GltfError> {
		let scene = config.scene.or(self.scene).ok_or(GltfError::NoScene)?;
		self.materialize_with(scene, config)
	}
}
