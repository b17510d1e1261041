pub use glam::*;

/// Scale applied to positions when moving from asset space (meters) into engine space (centimeters).
pub const UNIT_SCALE: f32 = 100.0;

/// A translation/rotation/scale decomposition of a node transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
	pub translation: Vec3,
	pub rotation: Quat,
	pub scale: Vec3,
}

impl Default for Transform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl Transform {
	pub const IDENTITY: Self = Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE };

	pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
		Self { translation, rotation, scale }
	}

	/// Decomposes a column-major 4x4 matrix.
	pub fn from_cols_slice(m: &[f32; 16]) -> Self {
		let (scale, rotation, translation) = Mat4::from_cols_slice(m).to_scale_rotation_translation();
		Self { translation, rotation, scale }
	}

	pub fn matrix(&self) -> Mat4 {
		Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
	}

	pub fn is_identity(&self) -> bool {
		*self == Self::IDENTITY
	}
}

/// Remaps a direction from the asset's right-handed y-up frame to the engine's z-up frame.
pub fn to_engine_axes(v: Vec3) -> Vec3 {
	Vec3::new(-v.z, v.x, v.y)
}

/// Remaps a point into engine space and converts it to engine units.
pub fn to_engine_position(v: Vec3) -> Vec3 {
	to_engine_axes(v) * UNIT_SCALE
}

fn encode_srgb(c: f32) -> f32 {
	let c = c.clamp(0.0, 1.0);
	if c <= 0.003_130_8 {
		c * 12.92
	} else {
		1.055 * c.powf(1.0 / 2.4) - 0.055
	}
}

fn quantize(c: f32) -> u8 {
	(c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Encodes a linear RGBA color as 8-bit sRGB. Alpha stays linear.
pub fn linear_to_srgb8(c: Vec4) -> U8Vec4 {
	U8Vec4::new(
		quantize(encode_srgb(c.x)),
		quantize(encode_srgb(c.y)),
		quantize(encode_srgb(c.z)),
		quantize(c.w),
	)
}
