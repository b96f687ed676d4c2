use crate::{Interval, Vec3};

/// Offset applied to the start of every ray so secondary rays do not
/// re-hit the surface they leave from.
pub const RAY_EPSILON: f32 = 5e-4;

/// A ray in 3D space with origin, direction, and a valid parametric range.
///
/// Only hits with `t` inside `t` (exclusive) count. Camera and bounce rays
/// run to infinity; shadow segments stop just short of their end point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t: Interval,
}

impl Ray {
    /// Create a new ray starting at `RAY_EPSILON` and running to infinity.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            t: Interval::new(RAY_EPSILON, f32::INFINITY),
        }
    }

    /// Create a shadow segment from `from` to `to`.
    ///
    /// The direction is normalized and the range excludes both end points,
    /// so neither the shading point nor the light sample is reported as
    /// an occluder.
    pub fn segment(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        let dist = delta.length();
        Self {
            origin: from,
            direction: delta / dist,
            t: Interval::new(RAY_EPSILON, dist - RAY_EPSILON),
        }
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
