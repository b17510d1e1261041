pub mod config;
pub mod gltf;
pub mod math;

pub use config::ImportConfig;
pub use gltf::{load, Document, GltfError, SceneTree};
