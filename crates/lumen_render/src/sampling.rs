//! Hemisphere sampling in a local frame where the normal is +Z.
//!
//! Each sampler maps a uniform 2D sample in [0, 1)^2 to a unit direction
//! and has a matching solid-angle density.

use lumen_math::{Vec2, Vec3};
use std::f32::consts::PI;

/// Cosine-weighted direction on the +Z hemisphere.
pub fn sample_hemisphere_cosine(ruv: Vec2) -> Vec3 {
    let z = ruv.y.sqrt();
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * ruv.x;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Density of `sample_hemisphere_cosine`: cos(theta) / pi.
pub fn sample_hemisphere_cosine_pdf(dir: Vec3) -> f32 {
    if dir.z <= 0.0 {
        0.0
    } else {
        dir.z / PI
    }
}

/// Direction on the +Z hemisphere distributed as cos(theta)^n.
pub fn sample_hemisphere_cospower(ruv: Vec2, n: f32) -> Vec3 {
    let z = ruv.y.powf(1.0 / (n + 1.0));
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * ruv.x;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Density of `sample_hemisphere_cospower`: (n + 1) / (2 pi) * cos(theta)^n.
pub fn sample_hemisphere_cospower_pdf(dir: Vec3, n: f32) -> f32 {
    if dir.z <= 0.0 {
        0.0
    } else {
        dir.z.powf(n) * (n + 1.0) / (2.0 * PI)
    }
}
