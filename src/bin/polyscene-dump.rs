//! Loads a glTF asset and prints its materialized scene tree.
//!
//! Usage: `polyscene-dump <asset.gltf|asset.glb> [config.ron]`

use anyhow::{Context, Result};
use polyscene::gltf::{SceneNode, SceneTree, TextureSource};
use polyscene::ImportConfig;

fn print_node(node: &SceneNode, depth: usize) {
	let indent = "  ".repeat(depth);
	let name = node.name.as_deref().unwrap_or("<unnamed>");
	println!("{indent}node {} \"{name}\" at {}", node.node, node.world.w_axis.truncate());
	for g in &node.geometry {
		println!(
			"{indent}  mesh {} primitive {}: {} vertices, {} triangles, {} material",
			g.mesh, g.primitive, g.vertex_count(), g.triangle_count(), g.material.archetype,
		);
		if let Some(texture) = &g.material.base_color_texture {
			let source = match &texture.source {
				TextureSource::Path(path) => path.display().to_string(),
				TextureSource::Embedded(bytes) => format!("{} embedded bytes", bytes.len()),
			};
			println!("{indent}    base color texture {source} ({})", texture.mime_type.as_deref().unwrap_or("unknown type"));
		}
	}
}

fn print_tree(tree: &SceneTree) {
	println!("scene {}", tree.scene);
	let mut stack: Vec<_> = tree.roots.iter().rev().map(|root| (root, 1)).collect();
	while let Some((node, depth)) = stack.pop() {
		print_node(node, depth);
		stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
	}
	for issue in &tree.warnings {
		println!("skipped: {issue:?}");
	}
	println!("{} geometries, complete: {}", tree.geometry_count(), tree.is_complete());
}

fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.init();

	let mut args = std::env::args().skip(1);
	let asset = args.next().context("usage: polyscene-dump <asset> [config.ron]")?;
	let config = match args.next() {
		Some(path) => ImportConfig::load(&path).with_context(|| format!("failed to read config {path}"))?,
		None => ImportConfig::default(),
	};

	let document = polyscene::load(&asset).with_context(|| format!("failed to load {asset}"))?;
	tracing::info!(
		"{} ({:?}, generator {})",
		asset, document.version, document.asset.generator.as_deref().unwrap_or("unknown"),
	);
	let tree = document.materialize_default(&config).context("failed to materialize scene")?;
	print_tree(&tree);
	Ok(())
}
