use strum_macros::{Display, EnumIter};

use crate::math::{linear_to_srgb8, to_engine_axes, to_engine_position, U8Vec4, Vec2, Vec3, Vec4};

use super::*;

/// Largest element count decoded for an accessor with no bufferView. Those elements are
/// zeros with no bytes behind them, so `count` is the only thing bounding the allocation.
pub const MAX_ZEROED_ELEMENTS: usize = 1 << 24;

/// What an accessor's elements are decoded into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum ElementKind {
	Index,
	Position,
	Normal,
	#[strum(serialize = "UV")]
	Uv,
	Color,
}

impl ElementKind {
	pub fn accepts(self, ty: AccessorType) -> bool {
		match self {
			ElementKind::Index => ty == AccessorType::Scalar,
			ElementKind::Position | ElementKind::Normal => ty == AccessorType::Vec3,
			ElementKind::Uv => ty == AccessorType::Vec2,
			ElementKind::Color => matches!(ty, AccessorType::Vec3 | AccessorType::Vec4),
		}
	}

	pub fn assemble(self, c: &[f64]) -> TypedElement {
		match self {
			ElementKind::Index => TypedElement::Index(index(c)),
			ElementKind::Position => TypedElement::Position(position(c)),
			ElementKind::Normal => TypedElement::Normal(normal(c)),
			ElementKind::Uv => TypedElement::Uv(uv(c)),
			ElementKind::Color => TypedElement::Color(color(c)),
		}
	}
}

/// A single decoded element, already converted into engine space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TypedElement {
	Index(u32),
	Position(Vec3),
	Normal(Vec3),
	Uv(Vec2),
	/// 8-bit sRGB with linear alpha.
	Color(U8Vec4),
}

fn vec3(c: &[f64]) -> Vec3 {
	Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)
}

fn index(c: &[f64]) -> u32 {
	c[0] as u32
}

fn position(c: &[f64]) -> Vec3 {
	to_engine_position(vec3(c))
}

fn normal(c: &[f64]) -> Vec3 {
	to_engine_axes(vec3(c))
}

fn uv(c: &[f64]) -> Vec2 {
	Vec2::new(c[0] as f32, c[1] as f32)
}

fn color(c: &[f64]) -> U8Vec4 {
	let mut rgba = [0.0, 0.0, 0.0, 1.0];
	for (o, v) in rgba.iter_mut().zip(c) {
		*o = *v as f32;
	}
	linear_to_srgb8(Vec4::from_array(rgba))
}

/// Reads one little-endian component. `bytes` is exactly `ty.byte_size()` long.
fn read_component(ty: ComponentType, bytes: &[u8]) -> f64 {
	match ty {
		ComponentType::I8 => bytemuck::pod_read_unaligned::<i8>(bytes) as f64,
		ComponentType::U8 => bytemuck::pod_read_unaligned::<u8>(bytes) as f64,
		ComponentType::I16 => i16::from_le(bytemuck::pod_read_unaligned(bytes)) as f64,
		ComponentType::U16 => u16::from_le(bytemuck::pod_read_unaligned(bytes)) as f64,
		ComponentType::I32 => i32::from_le(bytemuck::pod_read_unaligned(bytes)) as f64,
		ComponentType::U32 => u32::from_le(bytemuck::pod_read_unaligned(bytes)) as f64,
		ComponentType::F32 => f32::from_bits(u32::from_le(bytemuck::pod_read_unaligned(bytes))) as f64,
	}
}

impl Document {
	/// Effective distance in bytes between consecutive elements of an accessor.
	pub fn accessor_stride(&self, accessor: &Accessor, element_size: usize) -> Result<usize, GltfError> {
		let view_stride = match accessor.buffer_view {
			Some(v) => self.buffer_view(v)?.byte_stride,
			None => None,
		};
		Ok(accessor.byte_stride.filter(|s| *s != 0)
			.or(view_stride.filter(|s| *s != 0))
			.unwrap_or(element_size))
	}

	fn decode_with<T>(
		&self,
		i: usize,
		kind: ElementKind,
		assemble: impl Fn(&[f64]) -> T,
	) -> Result<Vec<T>, GltfError> {
		let accessor = self.accessor(i)?;
		let component = accessor.component_type()
			.filter(|_| kind.accepts(accessor.ty))
			.ok_or(GltfError::UnsupportedAccessorFormat {
				accessor: i,
				component_type: accessor.component_type,
				shape: accessor.ty,
				kind,
			})?;
		let n = accessor.ty.component_count();
		let size = component.byte_size();
		let element_size = n * size;
		let count = accessor.count;
		if count == 0 {
			return Ok(Vec::new());
		}

		let Some(view) = accessor.buffer_view else {
			if count > MAX_ZEROED_ELEMENTS {
				return Err(GltfError::ElementLimit { accessor: i, count, limit: MAX_ZEROED_ELEMENTS });
			}
			let zeros = [0.0; 16];
			return Ok((0..count).map(|_| assemble(&zeros[..n])).collect());
		};
		let bytes = self.view_bytes(view)?;
		let stride = self.accessor_stride(accessor, element_size)?;

		let needed = stride.checked_mul(count - 1)
			.and_then(|v| v.checked_add(accessor.byte_offset))
			.and_then(|v| v.checked_add(element_size));
		match needed {
			Some(needed) if needed <= bytes.len() => {},
			_ => return Err(GltfError::OutOfRange {
				what: format!("accessors[{i}] in bufferViews[{view}]"),
				needed: needed.unwrap_or(usize::MAX),
				available: bytes.len(),
			}),
		}

		let mut components = [0.0; 16];
		Ok((0..count).map(|e| {
			let start = accessor.byte_offset + stride * e;
			for (j, c) in components[..n].iter_mut().enumerate() {
				let at = start + size * j;
				*c = read_component(component, &bytes[at..at + size]);
			}
			assemble(&components[..n])
		}).collect())
	}

	/// Decodes accessor `i` into elements of `kind`.
	pub fn decode(&self, i: usize, kind: ElementKind) -> Result<Vec<TypedElement>, GltfError> {
		self.decode_with(i, kind, |c| kind.assemble(c))
	}

	pub fn decode_indices(&self, i: usize) -> Result<Vec<u32>, GltfError> {
		self.decode_with(i, ElementKind::Index, index)
	}

	pub fn decode_positions(&self, i: usize) -> Result<Vec<Vec3>, GltfError> {
		self.decode_with(i, ElementKind::Position, position)
	}

	pub fn decode_normals(&self, i: usize) -> Result<Vec<Vec3>, GltfError> {
		self.decode_with(i, ElementKind::Normal, normal)
	}

	pub fn decode_uvs(&self, i: usize) -> Result<Vec<Vec2>, GltfError> {
		self.decode_with(i, ElementKind::Uv, uv)
	}

	pub fn decode_colors(&self, i: usize) -> Result<Vec<U8Vec4>, GltfError> {
		self.decode_with(i, ElementKind::Color, color)
	}
}
