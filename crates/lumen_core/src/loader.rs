//! JSON scene loading.
//!
//! A small serde-described format covering everything `Scene` holds.
//! Every field has a default, so `{}` is a valid (empty) scene. Texture
//! paths resolve relative to the scene file.
//!
//! ```json
//! {
//!   "camera": { "from": [0, 1, 4], "to": [0, 0, 0], "width": 1, "height": 1 },
//!   "lights": [ { "position": [0, 4, 0], "intensity": [20, 20, 20] } ],
//!   "surfaces": [
//!     { "shape": "quad", "origin": [0, 0, 0], "z": [0, 1, 0], "radius": 5,
//!       "material": { "kd": [0.5, 0.5, 0.5] } }
//!   ],
//!   "background": [1, 1, 1],
//!   "background_texture": "sky.hdr",
//!   "render": { "image_width": 256, "image_height": 256, "samples": 4 }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use lumen_math::{Frame, Vec3};
use serde::Deserialize;
use thiserror::Error;

use crate::scene::{
    BrdfModel, Camera, Environment, Material, PointLight, RenderSettings, Scene, SceneError,
    Surface, SurfaceShape, TexturedColor,
};
use crate::texture::{TextureCache, TextureError};

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Invalid scene: {0}")]
    Invalid(#[from] SceneError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Deserialize, Debug)]
#[serde(default)]
struct CameraDesc {
    from: [f32; 3],
    to: [f32; 3],
    up: [f32; 3],
    width: f32,
    height: f32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            from: [0.0, 0.0, 1.0],
            to: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            width: 1.0,
            height: 1.0,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LightDesc {
    position: [f32; 3],
    intensity: [f32; 3],
}

#[derive(Deserialize, Debug)]
#[serde(default)]
struct MaterialDesc {
    ke: [f32; 3],
    kd: [f32; 3],
    ks: [f32; 3],
    n: f32,
    model: BrdfModel,
    ke_texture: Option<String>,
    kd_texture: Option<String>,
    ks_texture: Option<String>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        let m = Material::default();
        Self {
            ke: m.emission.value.to_array(),
            kd: m.diffuse.value.to_array(),
            ks: m.specular.value.to_array(),
            n: m.exponent,
            model: m.model,
            ke_texture: None,
            kd_texture: None,
            ks_texture: None,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
struct SurfaceDesc {
    shape: SurfaceShape,
    origin: [f32; 3],
    /// Frame Z axis; the quad normal
    z: Option<[f32; 3]>,
    radius: f32,
    material: MaterialDesc,
}

impl Default for SurfaceDesc {
    fn default() -> Self {
        Self {
            shape: SurfaceShape::default(),
            origin: [0.0; 3],
            z: None,
            radius: 1.0,
            material: MaterialDesc::default(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SceneDesc {
    camera: CameraDesc,
    lights: Vec<LightDesc>,
    surfaces: Vec<SurfaceDesc>,
    background: [f32; 3],
    background_texture: Option<String>,
    ambient: [f32; 3],
    render: RenderSettings,
}

/// Load a JSON scene file.
///
/// Textures are resolved relative to the scene file's directory.
pub fn load_json_scene(path: impl AsRef<Path>) -> LoadResult<Scene> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut textures = TextureCache::with_base_dir(base_dir);

    let scene = parse_json_scene(&json, &mut textures)?;
    log::info!(
        "Loaded {}: {} lights, {} surfaces ({} emissive), {} textures",
        path.display(),
        scene.lights.len(),
        scene.surfaces.len(),
        scene.area_light_count(),
        textures.len()
    );
    Ok(scene)
}

/// Parse a JSON scene, loading textures through `textures`.
pub fn parse_json_scene(json: &str, textures: &mut TextureCache) -> LoadResult<Scene> {
    let desc: SceneDesc = serde_json::from_str(json)?;

    let camera = Camera::look_at(
        Vec3::from_array(desc.camera.from),
        Vec3::from_array(desc.camera.to),
        Vec3::from_array(desc.camera.up),
        desc.camera.width,
        desc.camera.height,
    );

    let lights = desc
        .lights
        .iter()
        .map(|l| PointLight::new(Vec3::from_array(l.position), Vec3::from_array(l.intensity)))
        .collect();

    let mut surfaces = Vec::with_capacity(desc.surfaces.len());
    for s in &desc.surfaces {
        let origin = Vec3::from_array(s.origin);
        let frame = match s.z {
            Some(z) => Frame::from_origin_z(origin, Vec3::from_array(z)),
            None => Frame::from_origin(origin),
        };
        surfaces.push(Surface {
            frame,
            radius: s.radius,
            shape: s.shape,
            material: Arc::new(build_material(&s.material, textures)?),
        });
    }

    let background_texture = desc
        .background_texture
        .as_deref()
        .map(|p| textures.load(p))
        .transpose()?;

    let scene = Scene {
        camera,
        lights,
        surfaces,
        environment: Environment::new(Vec3::from_array(desc.background), background_texture),
        ambient: Vec3::from_array(desc.ambient),
        settings: desc.render,
    };
    scene.validate()?;
    Ok(scene)
}

fn build_material(desc: &MaterialDesc, textures: &mut TextureCache) -> LoadResult<Material> {
    let mut textured = |value: [f32; 3], path: &Option<String>| -> LoadResult<TexturedColor> {
        let value = Vec3::from_array(value);
        Ok(match path {
            Some(p) => TexturedColor::textured(value, textures.load(p)?),
            None => TexturedColor::constant(value),
        })
    };

    Ok(Material {
        emission: textured(desc.ke, &desc.ke_texture)?,
        diffuse: textured(desc.kd, &desc.kd_texture)?,
        specular: textured(desc.ks, &desc.ks_texture)?,
        exponent: desc.n,
        model: desc.model,
    })
}
