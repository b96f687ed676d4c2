//! Scene data model consumed read-only by the renderer.
//!
//! Everything here is plain data. The renderer shares one `Scene` across
//! all worker threads for the whole render, so textures are held behind
//! `Arc` and nothing has interior mutability.

use std::sync::Arc;

use lumen_math::{Frame, Ray, Vec2, Vec3};
use serde::Deserialize;
use thiserror::Error;

use crate::texture::{lookup_scaled, Image};
use crate::Color;

/// Errors found while validating a scene before rendering.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("Image dimensions must be positive, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Samples per pixel axis must be at least 1")]
    NoSamples,

    #[error("Camera has a degenerate frame or a {width}x{height} sensor")]
    InvalidCamera { width: f32, height: f32 },

    #[error("Surface {index} has invalid radius {radius}")]
    InvalidRadius { index: usize, radius: f32 },

    #[error("Invalid {what}: {value:?}")]
    InvalidValue { what: String, value: Vec3 },
}

/// A base color optionally modulated by a texture.
#[derive(Clone, Debug, Default)]
pub struct TexturedColor {
    pub value: Color,
    pub texture: Option<Arc<Image>>,
}

impl TexturedColor {
    /// An untextured constant.
    pub fn constant(value: Color) -> Self {
        Self {
            value,
            texture: None,
        }
    }

    /// A base value scaled by a texture.
    pub fn textured(value: Color, texture: Arc<Image>) -> Self {
        Self {
            value,
            texture: Some(texture),
        }
    }

    /// Evaluate at a surface coordinate with edge-clamped addressing.
    #[inline]
    pub fn eval(&self, uv: Vec2) -> Color {
        lookup_scaled(self.value, self.texture.as_deref(), uv, false)
    }

    /// True if the base value is zero, whatever the texture holds.
    pub fn is_zero(&self) -> bool {
        self.value == Color::ZERO
    }
}

/// Which reflectance formula a material uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrdfModel {
    /// Normalized Blinn-Phong: diffuse plus a cosine-power specular lobe.
    #[default]
    Standard,
    /// Cook-Torrance style microfacet specular.
    Microfacet,
}

/// Surface material: emission, diffuse and specular reflectance, and a
/// specular exponent.
#[derive(Clone, Debug)]
pub struct Material {
    /// Emitted radiance (ke)
    pub emission: TexturedColor,

    /// Diffuse reflectance (kd)
    pub diffuse: TexturedColor,

    /// Specular reflectance (ks)
    pub specular: TexturedColor,

    /// Specular exponent (n)
    pub exponent: f32,

    /// BRDF formula
    pub model: BrdfModel,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            emission: TexturedColor::constant(Color::ZERO),
            diffuse: TexturedColor::constant(Color::splat(0.75)),
            specular: TexturedColor::constant(Color::ZERO),
            exponent: 10.0,
            model: BrdfModel::Standard,
        }
    }
}

impl Material {
    /// Pure diffuse material.
    pub fn diffuse(kd: Color) -> Self {
        Self {
            diffuse: TexturedColor::constant(kd),
            ..Default::default()
        }
    }

    /// Black emitter, used for area lights.
    pub fn emissive(ke: Color) -> Self {
        Self {
            emission: TexturedColor::constant(ke),
            diffuse: TexturedColor::constant(Color::ZERO),
            ..Default::default()
        }
    }

    /// Builder method to set the specular lobe.
    pub fn with_specular(mut self, ks: Color, exponent: f32) -> Self {
        self.specular = TexturedColor::constant(ks);
        self.exponent = exponent;
        self
    }

    /// Builder method to set the BRDF formula.
    pub fn with_model(mut self, model: BrdfModel) -> Self {
        self.model = model;
        self
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        !self.emission.is_zero()
    }
}

/// An isotropic point light.
#[derive(Clone, Copy, Debug)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: Color,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: Color) -> Self {
        Self {
            position,
            intensity,
        }
    }
}

/// Surface primitive kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceShape {
    /// Square in the frame's XY plane, half-size `radius`, facing +Z.
    Quad,
    /// Sphere centered on the frame origin.
    #[default]
    Sphere,
}

/// A scene surface. Surfaces with emissive materials are also area lights.
#[derive(Clone, Debug)]
pub struct Surface {
    pub frame: Frame,
    pub radius: f32,
    pub shape: SurfaceShape,
    pub material: Arc<Material>,
}

impl Surface {
    /// Quad with half-size `radius` in `frame`'s XY plane.
    pub fn quad(frame: Frame, radius: f32, material: Arc<Material>) -> Self {
        Self {
            frame,
            radius,
            shape: SurfaceShape::Quad,
            material,
        }
    }

    /// Sphere of `radius` at `frame`'s origin.
    pub fn sphere(frame: Frame, radius: f32, material: Arc<Material>) -> Self {
        Self {
            frame,
            radius,
            shape: SurfaceShape::Sphere,
            material,
        }
    }

    /// Area of the light-sampling domain.
    ///
    /// Light sampling draws from the flat `2r x 2r` square for every shape,
    /// so this is the square's area regardless of `shape`.
    pub fn area(&self) -> f32 {
        4.0 * self.radius * self.radius
    }

    /// Check if this surface emits light.
    pub fn is_emissive(&self) -> bool {
        self.material.is_emissive()
    }
}

/// Background radiance seen by rays that leave the scene.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Scale applied to the environment texture
    pub color: Color,

    /// Equirectangular (lat-long) radiance map
    pub texture: Option<Arc<Image>>,
}

impl Environment {
    pub fn new(color: Color, texture: Option<Arc<Image>>) -> Self {
        Self { color, texture }
    }
}

/// Pinhole camera. `width` and `height` are the sensor extent at unit
/// distance in front of the frame origin.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub frame: Frame,
    pub width: f32,
    pub height: f32,
}

impl Camera {
    pub fn new(frame: Frame, width: f32, height: f32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    /// Camera at `from` looking toward `to`.
    pub fn look_at(from: Vec3, to: Vec3, up: Vec3, width: f32, height: f32) -> Self {
        Self::new(Frame::look_at(from, to, up), width, height)
    }

    /// Ray through normalized sensor coordinates `(u, v)` in [0, 1]^2.
    ///
    /// (0, 0) is the bottom-left corner of the sensor.
    pub fn generate_ray(&self, u: f32, v: f32) -> Ray {
        let local = Vec3::new((u - 0.5) * self.width, (v - 0.5) * self.height, -1.0).normalize();
        Ray::new(self.frame.origin, self.frame.transform_direction(local))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Frame::IDENTITY, 1.0, 1.0)
    }
}

/// Per-scene render configuration.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub image_width: u32,
    pub image_height: u32,

    /// Stratified samples per pixel axis (S x S per pixel)
    pub samples: u32,

    /// Maximum indirect bounce depth; 0 disables indirect lighting
    pub max_depth: u32,

    /// Whether direct lighting is shadow-tested
    pub shadows: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            image_width: 512,
            image_height: 512,
            samples: 1,
            max_depth: 2,
            shadows: true,
        }
    }
}

/// A complete scene, ready to render.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub camera: Camera,
    pub lights: Vec<PointLight>,
    pub surfaces: Vec<Surface>,
    pub environment: Environment,

    /// Constant ambient term, scaled by diffuse reflectance
    pub ambient: Color,

    pub settings: RenderSettings,
}

impl Scene {
    /// Create an empty scene seen through `camera`.
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Default::default()
        }
    }

    /// Add a point light.
    pub fn add_light(&mut self, light: PointLight) {
        self.lights.push(light);
    }

    /// Add a surface and return its index.
    pub fn add_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    /// Number of surfaces that act as area lights.
    pub fn area_light_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.is_emissive()).count()
    }

    /// Check the assumptions the renderer makes about its input.
    pub fn validate(&self) -> Result<(), SceneError> {
        let s = &self.settings;
        if s.image_width == 0 || s.image_height == 0 {
            return Err(SceneError::EmptyImage {
                width: s.image_width,
                height: s.image_height,
            });
        }
        if s.samples == 0 {
            return Err(SceneError::NoSamples);
        }

        let camera = &self.camera;
        let f = &camera.frame;
        let frame_ok = [f.origin, f.x, f.y, f.z].iter().all(|v| v.is_finite());
        let sensor_ok = [camera.width, camera.height]
            .iter()
            .all(|&d| d > 0.0 && d.is_finite());
        if !(frame_ok && sensor_ok) {
            return Err(SceneError::InvalidCamera {
                width: camera.width,
                height: camera.height,
            });
        }

        check_radiance("ambient", self.ambient)?;
        check_radiance("background", self.environment.color)?;
        for light in &self.lights {
            check_radiance("light intensity", light.intensity)?;
        }

        for (index, surface) in self.surfaces.iter().enumerate() {
            if !(surface.radius > 0.0 && surface.radius.is_finite()) {
                return Err(SceneError::InvalidRadius {
                    index,
                    radius: surface.radius,
                });
            }
            let m = &surface.material;
            check_radiance("emission", m.emission.value)?;
            check_radiance("diffuse", m.diffuse.value)?;
            check_radiance("specular", m.specular.value)?;
        }

        Ok(())
    }
}

/// Radiance-like inputs must be finite and non-negative.
fn check_radiance(what: &str, value: Vec3) -> Result<(), SceneError> {
    if value.is_finite() && value.min_element() >= 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidValue {
            what: what.to_string(),
            value,
        })
    }
}
