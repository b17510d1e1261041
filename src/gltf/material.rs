use std::path::PathBuf;

use strum_macros::{Display, EnumIter};

use crate::math::{Vec3, Vec4};

use super::*;

/// Shading model a renderer should pick for a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Archetype {
	Paper,
	Glass,
	Pbr,
	/// Metallic-roughness with alpha blending.
	PbrTranslucent,
	/// The primitive has no material.
	Unlit,
	/// The material names a technique that is not recognized.
	None,
}

/// Shader annotations version 1 techniques carry in `extras.gvrss`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum Technique {
	Paper,
	Glass,
	Gem,
}

impl Technique {
	pub fn url(self) -> &'static str {
		match self {
			Technique::Paper => "https://vr.google.com/shaders/w/gvrss/paper.json",
			Technique::Glass => "https://vr.google.com/shaders/w/gvrss/glass.json",
			Technique::Gem => "https://vr.google.com/shaders/w/gvrss/gem.json",
		}
	}

	pub fn from_url(url: &str) -> Option<Self> {
		match url {
			"https://vr.google.com/shaders/w/gvrss/paper.json" => Some(Technique::Paper),
			"https://vr.google.com/shaders/w/gvrss/glass.json" => Some(Technique::Glass),
			"https://vr.google.com/shaders/w/gvrss/gem.json" => Some(Technique::Gem),
			_ => None,
		}
	}

	pub fn archetype(self) -> Archetype {
		match self {
			Technique::Paper => Archetype::Paper,
			// gem has no shading model of its own yet
			Technique::Glass | Technique::Gem => Archetype::Glass,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
	Path(PathBuf),
	/// Image bytes copied out of a buffer view.
	Embedded(Vec<u8>),
}

/// A texture the renderer still has to decode and upload.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingTexture {
	pub source: TextureSource,
	pub mime_type: Option<String>,
	pub sampler: Sampler,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMaterial {
	pub name: Option<String>,
	pub archetype: Archetype,
	pub technique: Option<Technique>,
	/// Linear RGBA.
	pub base_color: Vec4,
	pub metallic: f32,
	pub roughness: f32,
	pub emissive: Vec3,
	pub alpha_mode: AlphaMode,
	pub alpha_cutoff: f32,
	pub double_sided: bool,
	pub base_color_texture: Option<PendingTexture>,
}

impl ResolvedMaterial {
	/// What a primitive without a material is drawn with.
	pub fn unlit() -> Self {
		Self {
			name: None,
			archetype: Archetype::Unlit,
			technique: None,
			base_color: Vec4::ONE,
			metallic: 0.0,
			roughness: 1.0,
			emissive: Vec3::ZERO,
			alpha_mode: AlphaMode::Opaque,
			alpha_cutoff: 0.5,
			double_sided: false,
			base_color_texture: None,
		}
	}

	fn from_technique(name: Option<String>, annotation: Option<&str>) -> Self {
		let technique = annotation.and_then(Technique::from_url);
		if technique.is_none() {
			if let Some(url) = annotation {
				tracing::debug!("unrecognized technique {url}");
			}
		}
		Self {
			name,
			archetype: technique.map_or(Archetype::None, Technique::archetype),
			technique,
			..Self::unlit()
		}
	}
}

const KNOWN_MIME_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

impl Document {
	fn pending_texture(&self, texture: usize) -> Result<Option<PendingTexture>, GltfError> {
		let texture = self.texture(texture)?;
		let Some(image) = texture.source else {
			tracing::warn!("texture has no image source, ignoring it");
			return Ok(None);
		};
		let image = self.image(image)?;
		let source = match &image.source {
			ImageSource::Path(path) => TextureSource::Path(path.clone()),
			ImageSource::BufferView(view) => TextureSource::Embedded(self.view_bytes(*view)?.to_vec()),
		};
		match image.mime_type.as_deref() {
			Some(mime) if KNOWN_MIME_TYPES.contains(&mime) => {},
			mime => tracing::warn!("image has mime type {mime:?}, it may not be decodable"),
		}
		let sampler = match texture.sampler {
			Some(s) => self.sampler(s)?.clone(),
			None => Sampler::default(),
		};
		Ok(Some(PendingTexture { source, mime_type: image.mime_type.clone(), sampler }))
	}

	/// Maps a primitive's material reference to an archetype and its parameters.
	pub fn resolve_material(&self, material: Option<usize>) -> Result<ResolvedMaterial, GltfError> {
		let Some(material) = material else {
			return Ok(ResolvedMaterial::unlit());
		};
		let material = self.material(material)?;
		let pbr = match &material.shading {
			MaterialShading::Technique(annotation) => {
				return Ok(ResolvedMaterial::from_technique(material.name.clone(), annotation.as_deref()));
			},
			MaterialShading::Pbr(pbr) => pbr,
		};
		let base_color_texture = match pbr.base_color_texture {
			Some(t) => self.pending_texture(t)?,
			None => None,
		};
		Ok(ResolvedMaterial {
			name: material.name.clone(),
			archetype: match pbr.alpha_mode {
				AlphaMode::Blend => Archetype::PbrTranslucent,
				AlphaMode::Opaque | AlphaMode::Mask => Archetype::Pbr,
			},
			technique: None,
			base_color: Vec4::from_array(pbr.base_color_factor),
			metallic: pbr.metallic_factor,
			roughness: pbr.roughness_factor,
			emissive: Vec3::from_array(pbr.emissive_factor),
			alpha_mode: pbr.alpha_mode,
			alpha_cutoff: pbr.alpha_cutoff,
			double_sided: pbr.double_sided,
			base_color_texture,
		})
	}
}

#[cfg(test)]
mod tests {
	use strum::IntoEnumIterator;

	use super::*;
	use crate::gltf::accessor::tests::document;

	fn technique_material(annotation: Option<&str>) -> Material {
		Material { name: None, shading: MaterialShading::Technique(annotation.map(String::from)) }
	}

	#[test]
	fn technique_urls_round_trip() {
		for t in Technique::iter() {
			assert_eq!(Technique::from_url(t.url()), Some(t));
		}
	}

	#[test]
	fn v1_techniques_pick_archetypes() {
		let mut doc = document(vec![], None, vec![]);
		doc.materials = vec![
			technique_material(Some(Technique::Paper.url())),
			technique_material(Some(Technique::Gem.url())),
			technique_material(Some("https://example.com/shaders/toon.json")),
			technique_material(None),
		];
		let paper = doc.resolve_material(Some(0)).unwrap();
		assert_eq!(paper.archetype, Archetype::Paper);
		let gem = doc.resolve_material(Some(1)).unwrap();
		assert_eq!(gem.archetype, Archetype::Glass);
		assert_eq!(gem.technique, Some(Technique::Gem));
		let unknown = doc.resolve_material(Some(2)).unwrap();
		assert_eq!(unknown.archetype, Archetype::None);
		assert_eq!(unknown.technique, None);
		assert_eq!(doc.resolve_material(Some(3)).unwrap().archetype, Archetype::None);
	}

	#[test]
	fn missing_material_is_unlit() {
		let doc = document(vec![], None, vec![]);
		assert_eq!(doc.resolve_material(None).unwrap(), ResolvedMaterial::unlit());
		assert!(matches!(doc.resolve_material(Some(0)), Err(GltfError::InvalidReference { .. })));
	}

	#[test]
	fn pbr_parameters_carry_over() {
		let mut doc = document(vec![], None, vec![]);
		doc.materials = vec![
			Material {
				name: Some(String::from("glass")),
				shading: MaterialShading::Pbr(PbrMaterial {
					base_color_factor: [0.2, 0.4, 0.6, 0.5],
					metallic_factor: 0.0,
					roughness_factor: 0.25,
					alpha_mode: AlphaMode::Blend,
					double_sided: true,
					..Default::default()
				}),
			},
			Material { name: None, shading: MaterialShading::Pbr(PbrMaterial::default()) },
		];
		let m = doc.resolve_material(Some(0)).unwrap();
		assert_eq!(m.archetype, Archetype::PbrTranslucent);
		assert_eq!(m.base_color, Vec4::new(0.2, 0.4, 0.6, 0.5));
		assert_eq!(m.roughness, 0.25);
		assert!(m.double_sided);
		assert_eq!(m.name.as_deref(), Some("glass"));
		let m = doc.resolve_material(Some(1)).unwrap();
		assert_eq!(m.archetype, Archetype::Pbr);
		assert_eq!(m.metallic, 1.0);
		assert_eq!(m.base_color_texture, None);
	}

	fn textured(doc: &mut Document, image: Image, sampler: Option<usize>) {
		doc.images = vec![image];
		doc.textures = vec![Texture { sampler, source: Some(0) }];
		doc.materials = vec![Material {
			name: None,
			shading: MaterialShading::Pbr(PbrMaterial { base_color_texture: Some(0), ..Default::default() }),
		}];
	}

	#[test]
	fn base_color_texture_is_deferred() {
		let mut doc = document(vec![], None, vec![]);
		textured(&mut doc, Image {
			name: None,
			source: ImageSource::Path(PathBuf::from("assets/wood.png")),
			mime_type: Some(String::from("image/png")),
		}, Some(0));
		doc.samplers = vec![Sampler { wrap_s: WrapMode::ClampToEdge, ..Default::default() }];
		let texture = doc.resolve_material(Some(0)).unwrap().base_color_texture.unwrap();
		assert_eq!(texture.source, TextureSource::Path(PathBuf::from("assets/wood.png")));
		assert_eq!(texture.mime_type.as_deref(), Some("image/png"));
		assert_eq!(texture.sampler.wrap_s, WrapMode::ClampToEdge);
		assert_eq!(texture.sampler.wrap_t, WrapMode::Repeat);
	}

	#[test]
	fn embedded_image_bytes_are_copied() {
		let mut doc = document(vec![0x89, b'P', b'N', b'G'], None, vec![]);
		textured(&mut doc, Image {
			name: None,
			source: ImageSource::BufferView(0),
			mime_type: Some(String::from("image/png")),
		}, None);
		let texture = doc.resolve_material(Some(0)).unwrap().base_color_texture.unwrap();
		assert_eq!(texture.source, TextureSource::Embedded(vec![0x89, b'P', b'N', b'G']));
		assert_eq!(texture.sampler, Sampler::default());
	}
}
