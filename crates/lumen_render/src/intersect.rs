//! Ray-scene intersection interface and a brute-force implementation.
//!
//! The renderer only talks to `Intersector`. `SurfaceList` tests every
//! scene surface in turn; anything faster (a BVH, Embree) plugs in
//! behind the same trait.

use lumen_core::{Material, Scene, Surface, SurfaceShape};
use lumen_math::{Interval, Ray, Vec2, Vec3};
use std::f32::consts::PI;

/// Record of a ray-surface intersection.
#[derive(Clone, Copy, Debug)]
pub struct Intersection<'a> {
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit point
    pub position: Vec3,
    /// Shading normal; the surface's outward normal, not flipped toward the ray
    pub normal: Vec3,
    /// Surface texture coordinate
    pub texcoord: Vec2,
    /// Material at the hit
    pub material: &'a Material,
}

/// Scene queries the renderer needs: closest hit and occlusion.
pub trait Intersector: Send + Sync {
    /// Closest hit with `t` strictly inside `ray.t`.
    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>>;

    /// True if anything lies strictly inside `ray.t`.
    fn occluded(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }
}

/// Geometry of a single hit, before the material is attached.
struct SurfaceHit {
    t: f32,
    normal: Vec3,
    texcoord: Vec2,
}

/// A list of surfaces intersected one by one.
pub struct SurfaceList<'a> {
    surfaces: &'a [Surface],
}

impl<'a> SurfaceList<'a> {
    /// Wrap a slice of surfaces.
    pub fn new(surfaces: &'a [Surface]) -> Self {
        Self { surfaces }
    }

    /// All surfaces of `scene`.
    pub fn from_scene(scene: &'a Scene) -> Self {
        Self::new(&scene.surfaces)
    }
}

impl Intersector for SurfaceList<'_> {
    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        let mut closest: Option<Intersection<'_>> = None;
        let mut ray_t = ray.t;

        for surface in self.surfaces {
            if let Some(hit) = hit_surface(surface, ray, ray_t) {
                ray_t = ray_t.with_max(hit.t);
                closest = Some(Intersection {
                    t: hit.t,
                    position: ray.at(hit.t),
                    normal: hit.normal,
                    texcoord: hit.texcoord,
                    material: &surface.material,
                });
            }
        }

        closest
    }

    fn occluded(&self, ray: &Ray) -> bool {
        self.surfaces
            .iter()
            .any(|surface| hit_surface(surface, ray, ray.t).is_some())
    }
}

fn hit_surface(surface: &Surface, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    match surface.shape {
        SurfaceShape::Quad => hit_quad(surface, ray, ray_t),
        SurfaceShape::Sphere => hit_sphere(surface, ray, ray_t),
    }
}

/// Square `|x|, |y| <= radius` in the frame's z = 0 plane.
///
/// Texture coordinates map the square to [0, 1]^2, the same mapping area
/// light sampling uses.
fn hit_quad(surface: &Surface, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    let frame = &surface.frame;
    let origin = frame.inverse_transform_point(ray.origin());
    let direction = frame.inverse_transform_direction(ray.direction());

    if direction.z.abs() < 1e-9 {
        return None;
    }
    let t = -origin.z / direction.z;
    if !ray_t.surrounds(t) {
        return None;
    }

    let p = origin + direction * t;
    let r = surface.radius;
    if p.x.abs() > r || p.y.abs() > r {
        return None;
    }

    Some(SurfaceHit {
        t,
        normal: frame.z,
        texcoord: Vec2::new((p.x / r + 1.0) * 0.5, (p.y / r + 1.0) * 0.5),
    })
}

/// Sphere of `radius` around the frame origin.
fn hit_sphere(surface: &Surface, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    let center = surface.frame.origin;
    let oc = center - ray.origin();
    let a = ray.direction().length_squared();
    let h = ray.direction().dot(oc);
    let c = oc.length_squared() - surface.radius * surface.radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();

    // Find the nearest root in the acceptable range
    let mut root = (h - sqrtd) / a;
    if !ray_t.surrounds(root) {
        root = (h + sqrtd) / a;
        if !ray_t.surrounds(root) {
            return None;
        }
    }

    let outward_normal = (ray.at(root) - center) / surface.radius;
    Some(SurfaceHit {
        t: root,
        normal: outward_normal,
        texcoord: sphere_uv(surface.frame.inverse_transform_direction(outward_normal)),
    })
}

/// Lat-long coordinates of a unit vector in the sphere's local frame.
fn sphere_uv(p: Vec3) -> Vec2 {
    let u = (p.y.atan2(p.x) / (2.0 * PI)).rem_euclid(1.0);
    let v = p.z.clamp(-1.0, 1.0).acos() / PI;
    Vec2::new(u, v)
}
