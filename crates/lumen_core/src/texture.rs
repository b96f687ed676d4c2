//! HDR images, bilinear texture lookup, and texture loading.
//!
//! `Image` is the one dense 2D radiance array used both as a material or
//! environment texture and as the render target. Row 0 is the bottom of
//! the image: textures are flipped on load and encoders flip on write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use lumen_math::{Vec2, Vec3};
use thiserror::Error;

use crate::Color;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture: {0}")]
    LoadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Pixel count {len} does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, len: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A dense 2D array of linear HDR RGB values.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Row-major pixels, `pixels[j * width + i]`
    pub pixels: Vec<Color>,
}

impl Image {
    /// Create a new image filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::ZERO)
    }

    /// Create an image where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Wrap existing row-major pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> TextureResult<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Get the pixel at (i, j).
    #[inline]
    pub fn at(&self, i: u32, j: u32) -> Color {
        self.pixels[j as usize * self.width as usize + i as usize]
    }

    /// Set the pixel at (i, j).
    #[inline]
    pub fn set(&mut self, i: u32, j: u32, color: Color) {
        let idx = j as usize * self.width as usize + i as usize;
        self.pixels[idx] = color;
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Color>()
    }
}

/// Scale `value` by a bilinear lookup of `texture` at `uv`.
///
/// With no texture bound the lookup is the multiplicative identity and
/// `value` comes back unchanged. Texel coordinates are `uv * (width,
/// height)`; out-of-range indices are clamped to the edge, or wrapped
/// around when `tile` is set.
pub fn lookup_scaled(value: Color, texture: Option<&Image>, uv: Vec2, tile: bool) -> Color {
    let Some(texture) = texture else {
        return value;
    };

    let x = uv.x * texture.width as f32;
    let y = uv.y * texture.height as f32;
    let i = x.floor() as i64;
    let j = y.floor() as i64;
    let s = x - i as f32;
    let t = y - j as f32;

    let address = |k: i64, dim: u32| -> u32 {
        let dim = dim as i64;
        if tile {
            k.rem_euclid(dim) as u32
        } else {
            k.clamp(0, dim - 1) as u32
        }
    };
    let i0 = address(i, texture.width);
    let i1 = address(i.saturating_add(1), texture.width);
    let j0 = address(j, texture.height);
    let j1 = address(j.saturating_add(1), texture.height);

    value
        * (texture.at(i0, j0) * ((1.0 - s) * (1.0 - t))
            + texture.at(i0, j1) * ((1.0 - s) * t)
            + texture.at(i1, j0) * (s * (1.0 - t))
            + texture.at(i1, j1) * (s * t))
}

/// Cache for loaded textures.
///
/// Textures are loaded on-demand and cached for reuse, so materials that
/// share a file share one `Arc<Image>`.
pub struct TextureCache {
    /// Cached textures by file path
    textures: HashMap<String, Arc<Image>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<Image>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let full_path = self.resolve_path(path);
        let texture = Arc::new(load_texture_file(&full_path)?);
        self.textures.insert(path.to_string(), texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Insert an in-memory texture under `path`.
    pub fn insert(&mut self, path: impl Into<String>, texture: Image) -> Arc<Image> {
        let texture = Arc::new(texture);
        self.textures.insert(path.into(), texture.clone());
        texture
    }

    /// Get the number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a texture from a file path.
///
/// Float formats (HDR, EXR) are taken as linear; everything else is
/// decoded as 8-bit sRGB.
fn load_texture_file(path: &Path) -> TextureResult<Image> {
    let img = image::open(path).map_err(|e| {
        TextureError::LoadError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let (width, height) = (img.width(), img.height());
    let top_down: Vec<Color> = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => img
            .into_rgb32f()
            .pixels()
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect(),
        _ => img
            .into_rgb8()
            .pixels()
            .map(|p| {
                Vec3::new(
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                )
            })
            .collect(),
    };

    // Flip so row 0 is the bottom of the image
    let pixels = top_down
        .chunks(width as usize)
        .rev()
        .flatten()
        .copied()
        .collect();

    Image::from_pixels(width, height, pixels)
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
