use std::str::FromStr;

use serde_json::{Map, Value};
use strum_macros::Display;

use super::GltfError;

/// What a field was expected to hold when a document fails validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum JsonKind {
	#[strum(serialize = "object")]
	Object,
	#[strum(serialize = "array")]
	Array,
	#[strum(serialize = "string")]
	String,
	#[strum(serialize = "number")]
	Number,
	#[strum(serialize = "non-negative integer")]
	Index,
	#[strum(serialize = "boolean")]
	Boolean,
	#[strum(serialize = "array of 3 numbers")]
	Vec3,
	#[strum(serialize = "array of 4 numbers")]
	Vec4,
	#[strum(serialize = "array of 16 numbers")]
	Mat4,
	#[strum(serialize = "accessor type (SCALAR, VEC2, VEC3, VEC4, MAT2, MAT3, MAT4)")]
	AccessorType,
	#[strum(serialize = "alpha mode (OPAQUE, MASK, BLEND)")]
	AlphaMode,
	#[strum(serialize = "known glTF enum value")]
	EnumValue,
}

fn violation(field: String, expected: JsonKind) -> GltfError {
	GltfError::SchemaViolation { field, expected }
}

fn float_kind(n: usize) -> JsonKind {
	match n {
		3 => JsonKind::Vec3,
		4 => JsonKind::Vec4,
		16 => JsonKind::Mat4,
		_ => JsonKind::Array,
	}
}

fn as_index(v: &Value) -> Option<usize> {
	v.as_u64().and_then(|i| usize::try_from(i).ok())
}

/// A JSON object that remembers where it sits in the document, so every accessor can
/// fail with the full path of the offending field.
#[derive(Clone, Debug)]
pub(crate) struct JsonObject<'a> {
	path: String,
	map: &'a Map<String, Value>,
}

impl<'a> JsonObject<'a> {
	pub fn root(value: &'a Value) -> Result<Self, GltfError> {
		match value {
			Value::Object(map) => Ok(Self { path: String::new(), map }),
			_ => Err(violation(String::from("<root>"), JsonKind::Object)),
		}
	}

	/// Where this object sits in the document, empty for the root.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn field(&self, key: &str) -> String {
		if self.path.is_empty() {
			String::from(key)
		} else {
			format!("{}.{}", self.path, key)
		}
	}

	pub fn get(&self, key: &str) -> Option<&'a Value> {
		self.map.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.map.contains_key(key)
	}

	fn required<T>(&self, key: &str, v: Option<T>, kind: JsonKind) -> Result<T, GltfError> {
		v.ok_or_else(|| violation(self.field(key), kind))
	}

	fn typed<T>(&self, key: &str, kind: JsonKind, f: impl FnOnce(&'a Value) -> Option<T>) -> Result<Option<T>, GltfError> {
		match self.map.get(key) {
			None => Ok(None),
			Some(v) => f(v).map(Some).ok_or_else(|| violation(self.field(key), kind)),
		}
	}

	pub fn object(&self, key: &str) -> Result<Option<JsonObject<'a>>, GltfError> {
		let path = self.field(key);
		self.typed(key, JsonKind::Object, |v| v.as_object()).map(|o| o.map(|map| JsonObject { path, map }))
	}

	pub fn req_object(&self, key: &str) -> Result<JsonObject<'a>, GltfError> {
		let v = self.object(key)?;
		self.required(key, v, JsonKind::Object)
	}

	/// An array of objects. Absent means empty.
	pub fn objects(&self, key: &str) -> Result<Vec<JsonObject<'a>>, GltfError> {
		let Some(items) = self.typed(key, JsonKind::Array, |v| v.as_array())? else {
			return Ok(Vec::new());
		};
		items.iter().enumerate().map(|(i, item)| {
			let path = format!("{}[{}]", self.field(key), i);
			match item {
				Value::Object(map) => Ok(JsonObject { path, map }),
				_ => Err(violation(path, JsonKind::Object)),
			}
		}).collect()
	}

	pub fn req_objects(&self, key: &str) -> Result<Vec<JsonObject<'a>>, GltfError> {
		if !self.contains(key) {
			return Err(violation(self.field(key), JsonKind::Array));
		}
		self.objects(key)
	}

	/// An object whose values are objects, keyed by id. Absent means empty.
	pub fn keyed_objects(&self, key: &str) -> Result<Vec<(&'a str, JsonObject<'a>)>, GltfError> {
		let Some(items) = self.typed(key, JsonKind::Object, |v| v.as_object())? else {
			return Ok(Vec::new());
		};
		items.iter().map(|(id, item)| {
			let path = format!("{}.{}", self.field(key), id);
			match item {
				Value::Object(map) => Ok((id.as_str(), JsonObject { path, map })),
				_ => Err(violation(path, JsonKind::Object)),
			}
		}).collect()
	}

	pub fn string(&self, key: &str) -> Result<Option<&'a str>, GltfError> {
		self.typed(key, JsonKind::String, |v| v.as_str())
	}

	pub fn req_string(&self, key: &str) -> Result<&'a str, GltfError> {
		let v = self.string(key)?;
		self.required(key, v, JsonKind::String)
	}

	pub fn name(&self) -> Result<Option<String>, GltfError> {
		Ok(self.string("name")?.map(String::from))
	}

	pub fn index(&self, key: &str) -> Result<Option<usize>, GltfError> {
		self.typed(key, JsonKind::Index, as_index)
	}

	pub fn req_index(&self, key: &str) -> Result<usize, GltfError> {
		let v = self.index(key)?;
		self.required(key, v, JsonKind::Index)
	}

	pub fn code(&self, key: &str) -> Result<Option<u32>, GltfError> {
		self.typed(key, JsonKind::Index, |v| v.as_u64().and_then(|c| u32::try_from(c).ok()))
	}

	pub fn req_code(&self, key: &str) -> Result<u32, GltfError> {
		let v = self.code(key)?;
		self.required(key, v, JsonKind::Index)
	}

	/// A numeric glTF enum such as a wrap mode or primitive mode.
	pub fn code_enum<T>(&self, key: &str, from_repr: fn(u32) -> Option<T>) -> Result<Option<T>, GltfError> {
		match self.code(key)? {
			None => Ok(None),
			Some(c) => from_repr(c).map(Some).ok_or_else(|| violation(self.field(key), JsonKind::EnumValue)),
		}
	}

	/// A string glTF enum such as an accessor type or alpha mode.
	pub fn str_enum<T: FromStr>(&self, key: &str, kind: JsonKind) -> Result<Option<T>, GltfError> {
		match self.string(key)? {
			None => Ok(None),
			Some(s) => s.parse().map(Some).map_err(|_| violation(self.field(key), kind)),
		}
	}

	pub fn req_str_enum<T: FromStr>(&self, key: &str, kind: JsonKind) -> Result<T, GltfError> {
		let v = self.str_enum(key, kind)?;
		self.required(key, v, kind)
	}

	pub fn number(&self, key: &str) -> Result<Option<f32>, GltfError> {
		self.typed(key, JsonKind::Number, |v| v.as_f64().map(|f| f as f32))
	}

	pub fn boolean(&self, key: &str) -> Result<Option<bool>, GltfError> {
		self.typed(key, JsonKind::Boolean, |v| v.as_bool())
	}

	/// A fixed-size numeric array such as a translation or a color factor.
	pub fn floats<const N: usize>(&self, key: &str) -> Result<Option<[f32; N]>, GltfError> {
		self.typed(key, float_kind(N), |v| {
			let items = v.as_array().filter(|a| a.len() == N)?;
			let mut out = [0.0; N];
			for (o, item) in out.iter_mut().zip(items) {
				*o = item.as_f64()? as f32;
			}
			Some(out)
		})
	}

	fn array_of<T>(&self, key: &str, kind: JsonKind, f: impl Fn(&'a Value) -> Option<T>) -> Result<Vec<T>, GltfError> {
		let Some(items) = self.typed(key, JsonKind::Array, |v| v.as_array())? else {
			return Ok(Vec::new());
		};
		items.iter().enumerate().map(|(i, item)| {
			f(item).ok_or_else(|| violation(format!("{}[{}]", self.field(key), i), kind))
		}).collect()
	}

	/// An array of indices. Absent means empty.
	pub fn indices(&self, key: &str) -> Result<Vec<usize>, GltfError> {
		self.array_of(key, JsonKind::Index, as_index)
	}

	/// An array of string ids. Absent means empty.
	pub fn strings(&self, key: &str) -> Result<Vec<&'a str>, GltfError> {
		self.array_of(key, JsonKind::String, |v| v.as_str())
	}

	fn map_of<T>(&self, key: &str, kind: JsonKind, f: impl Fn(&'a Value) -> Option<T>) -> Result<Vec<(&'a str, T)>, GltfError> {
		let obj = self.req_object(key)?;
		obj.map.iter().map(|(k, v)| {
			f(v).map(|t| (k.as_str(), t)).ok_or_else(|| violation(obj.field(k), kind))
		}).collect()
	}

	/// A required object mapping names to indices.
	pub fn index_map(&self, key: &str) -> Result<Vec<(&'a str, usize)>, GltfError> {
		self.map_of(key, JsonKind::Index, as_index)
	}

	/// A required object mapping names to string ids.
	pub fn string_map(&self, key: &str) -> Result<Vec<(&'a str, &'a str)>, GltfError> {
		self.map_of(key, JsonKind::String, |v| v.as_str())
	}
}
