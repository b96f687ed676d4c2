// Orthonormal coordinate frames.
//
// Frames place lights, surfaces and the camera in the world, and give the
// BRDF sampler a local shading space where the normal is +Z.

use glam::Vec3;

/// An orthonormal frame: an origin plus three unit axes.
///
/// The axes are assumed orthonormal, so the inverse transform is a
/// projection onto the axes and normals transform like directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// World frame at the origin.
    pub const IDENTITY: Frame = Frame {
        origin: Vec3::ZERO,
        x: Vec3::X,
        y: Vec3::Y,
        z: Vec3::Z,
    };

    /// Build a frame from explicit axes.
    pub fn new(origin: Vec3, x: Vec3, y: Vec3, z: Vec3) -> Self {
        Self { origin, x, y, z }
    }

    /// Identity axes translated to `origin`.
    pub fn from_origin(origin: Vec3) -> Self {
        Self {
            origin,
            ..Self::IDENTITY
        }
    }

    /// Build a frame at the world origin whose Z axis is `z`.
    ///
    /// X and Y are arbitrary but stable for a given `z`.
    pub fn from_z(z: Vec3) -> Self {
        Self::from_origin_z(Vec3::ZERO, z)
    }

    /// Build a frame at `origin` whose Z axis is `z`.
    pub fn from_origin_z(origin: Vec3, z: Vec3) -> Self {
        let z = z.normalize();
        let up = if z.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
        let x = up.cross(z).normalize();
        let y = z.cross(x);
        Self { origin, x, y, z }
    }

    /// Camera-style frame at `from` looking toward `to`.
    ///
    /// The frame looks down its local -Z axis, with Y as close to `up`
    /// as the view direction allows. When the view is parallel to `up`
    /// the frame falls back to the same up axis as `from_origin_z`.
    pub fn look_at(from: Vec3, to: Vec3, up: Vec3) -> Self {
        let z = (from - to).normalize();
        let x = up.cross(z).normalize_or_zero();
        if x == Vec3::ZERO {
            return Self::from_origin_z(from, z);
        }
        let y = z.cross(x);
        Self { origin: from, x, y, z }
    }

    /// Local point to world.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.origin + self.transform_direction(p)
    }

    /// Local direction to world (translation does not apply).
    #[inline]
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.x * d.x + self.y * d.y + self.z * d.z
    }

    /// Local normal to world, renormalized.
    #[inline]
    pub fn transform_normal(&self, n: Vec3) -> Vec3 {
        self.transform_direction(n).normalize()
    }

    /// World point to local.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.inverse_transform_direction(p - self.origin)
    }

    /// World direction to local.
    #[inline]
    pub fn inverse_transform_direction(&self, d: Vec3) -> Vec3 {
        Vec3::new(d.dot(self.x), d.dot(self.y), d.dot(self.z))
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}
