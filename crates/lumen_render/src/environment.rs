//! Environment (background) lighting from an equirectangular map.

use lumen_core::{lookup_scaled, Color, Environment, Image};
use lumen_math::{Vec2, Vec3};
use std::f32::consts::PI;

/// Radiance arriving from direction `dir` out of the environment.
///
/// Without a texture the environment is black, whatever `ke` is. With a
/// texture, `dir` is mapped to lat-long coordinates around +Y and looked
/// up with wrap addressing, scaled by `ke`.
pub fn eval_env(ke: Color, texture: Option<&Image>, dir: Vec3) -> Color {
    let Some(texture) = texture else {
        return Color::ZERO;
    };
    let u = dir.x.atan2(dir.z) / (2.0 * PI);
    let v = 1.0 - dir.y.clamp(-1.0, 1.0).acos() / PI;
    lookup_scaled(ke, Some(texture), Vec2::new(u, v), true)
}

/// `eval_env` for a scene environment.
#[inline]
pub fn environment_radiance(env: &Environment, dir: Vec3) -> Color {
    eval_env(env.color, env.texture.as_deref(), dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_no_texture_is_black() {
        let dirs = [Vec3::X, Vec3::Y, -Vec3::Y, Vec3::new(0.3, -0.4, 0.866)];
        for ke in [Vec3::ZERO, Vec3::ONE, Vec3::new(5.0, 0.1, 100.0)] {
            for d in dirs {
                assert_eq!(eval_env(ke, None, d), Vec3::ZERO);
            }
        }
    }

    #[test]
    fn test_constant_map_scales_ke() {
        let tex = Image::filled(1, 1, Vec3::new(0.5, 1.0, 2.0));
        let out = eval_env(Vec3::splat(2.0), Some(&tex), Vec3::new(0.6, 0.0, 0.8));
        assert!((out - Vec3::new(1.0, 2.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn test_latlong_rows() {
        // Row 0 (bottom) is red, row 1 (top) is green
        let mut tex = Image::new(1, 2);
        tex.set(0, 0, Vec3::X);
        tex.set(0, 1, Vec3::Y);

        // Straight down maps to v = 0
        let down = eval_env(Vec3::ONE, Some(&tex), -Vec3::Y);
        assert!((down - Vec3::X).length() < 1e-5);

        // The horizon maps to v = 0.5, the start of row 1
        let horizon = eval_env(Vec3::ONE, Some(&tex), Vec3::Z);
        assert!((horizon - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_environment_radiance() {
        let env = Environment::new(
            Vec3::splat(3.0),
            Some(Arc::new(Image::filled(2, 2, Vec3::ONE))),
        );
        let out = environment_radiance(&env, Vec3::new(0.0, 0.6, -0.8));
        assert!((out - Vec3::splat(3.0)).length() < 1e-5);

        let empty = Environment::new(Vec3::splat(3.0), None);
        assert_eq!(environment_radiance(&empty, Vec3::Y), Vec3::ZERO);
    }
}
