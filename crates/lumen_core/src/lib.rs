//! Lumen Core - Scene data model for the Lumen path tracer.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Camera`, `PointLight`, `Surface`, `Material`, `Environment`
//! - **Images and textures**: `Image`, bilinear `lookup_scaled`, `TextureCache`
//! - **Scene loading**: a JSON scene format
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_json_scene;
//!
//! let scene = load_json_scene("scene.json")?;
//! println!("Loaded {} surfaces, {} lights",
//!     scene.surfaces.len(),
//!     scene.lights.len());
//! ```

pub mod loader;
pub mod scene;
pub mod texture;

/// Linear RGB radiance or reflectance.
pub type Color = lumen_math::Vec3;

// Re-export commonly used types
pub use loader::{load_json_scene, parse_json_scene, LoadError, LoadResult};
pub use scene::{
    BrdfModel, Camera, Environment, Material, PointLight, RenderSettings, Scene, SceneError,
    Surface, SurfaceShape, TexturedColor,
};
pub use texture::{lookup_scaled, Image, TextureCache, TextureError, TextureResult};
