//! Light transport estimator.
//!
//! `trace_ray` estimates the radiance arriving along a ray: ambient,
//! emission (camera rays only), next-event estimation against point
//! lights, emissive surfaces and the environment map, and one
//! importance-sampled indirect bounce per level up to the scene's
//! maximum depth. There is no Russian roulette; recursion stops at the
//! depth cap.

use lumen_core::{BrdfModel, Color, Scene, Surface};
use lumen_math::{Ray, Vec3};

use crate::brdf::{eval_brdf, sample_brdf, BrdfSample};
use crate::environment::{environment_radiance, eval_env};
use crate::intersect::Intersector;
use crate::rng::PixelRng;

/// Sampled directions with a density at or below this are dropped.
pub const PDF_EPSILON: f32 = 1e-6;

/// Squared distance below which a light sample is treated as coincident
/// with the shading point and skipped.
const MIN_LIGHT_DISTANCE_SQUARED: f32 = 1e-8;

/// Material response at one hit point.
struct ShadingPoint {
    position: Vec3,
    normal: Vec3,
    /// Direction toward the viewer
    view: Vec3,
    kd: Color,
    ks: Color,
    exponent: f32,
    model: BrdfModel,
}

impl ShadingPoint {
    /// BRDF times the clamped cosine for light arriving from `l`.
    fn brdfcos(&self, l: Vec3) -> Color {
        let cos = self.normal.dot(l).max(0.0);
        if cos == 0.0 {
            return Color::ZERO;
        }
        cos * eval_brdf(
            self.kd,
            self.ks,
            self.exponent,
            self.view,
            l,
            self.normal,
            self.model,
        )
    }

    /// Draw an incident direction from the BRDF mixture.
    fn sample(&self, rng: &mut PixelRng) -> BrdfSample {
        let ruv = rng.next_vec2f();
        let rl = rng.next_float();
        sample_brdf(self.kd, self.ks, self.exponent, self.view, self.normal, ruv, rl)
    }

    /// Monte Carlo weight `brdfcos / pdf` of a sampled direction, or
    /// `None` when the sample cannot contribute.
    fn weight(&self, sample: &BrdfSample) -> Option<Color> {
        if !(sample.pdf > PDF_EPSILON && sample.pdf.is_finite()) {
            return None;
        }
        let brdfcos = self.brdfcos(sample.direction);
        if brdfcos == Color::ZERO {
            return None;
        }
        let weight = brdfcos / sample.pdf;
        weight.is_finite().then_some(weight)
    }
}

/// Estimate the radiance arriving along `ray`.
///
/// `depth` is 0 for camera rays. Every random draw comes from `rng`, so
/// the result is a pure function of the scene and the stream state.
pub fn trace_ray(
    scene: &Scene,
    world: &dyn Intersector,
    ray: &Ray,
    depth: u32,
    rng: &mut PixelRng,
) -> Color {
    let Some(hit) = world.intersect(ray) else {
        return environment_radiance(&scene.environment, ray.direction());
    };

    let material = hit.material;
    let uv = hit.texcoord;
    let ke = material.emission.eval(uv);
    let shading = ShadingPoint {
        position: hit.position,
        normal: hit.normal,
        view: -ray.direction().normalize(),
        kd: material.diffuse.eval(uv),
        ks: material.specular.eval(uv),
        exponent: material.exponent,
        model: material.model,
    };
    let pos = shading.position;

    // Ambient is always present
    let mut c = scene.ambient * shading.kd;

    // Emission is only seen directly; bounces that land on an emitter were
    // already counted by light sampling below.
    if depth == 0 {
        c += ke;
    }

    for light in &scene.lights {
        let to_light = light.position - pos;
        let dist2 = to_light.length_squared();
        if dist2 < MIN_LIGHT_DISTANCE_SQUARED {
            continue;
        }
        let cl = light.intensity / dist2;
        let l = to_light / dist2.sqrt();
        let shade = cl * shading.brdfcos(l);
        if shade == Color::ZERO || !shade.is_finite() {
            continue;
        }
        if unshadowed(scene, world, &Ray::segment(pos, light.position)) {
            c += shade;
        }
    }

    for surface in scene.surfaces.iter().filter(|s| s.is_emissive()) {
        if let Some((shade, sample_point)) = sample_area_light(surface, &shading, rng) {
            if unshadowed(scene, world, &Ray::segment(pos, sample_point)) {
                c += shade;
            }
        }
    }

    let env = &scene.environment;
    if let Some(texture) = env.texture.as_deref() {
        let sample = shading.sample(rng);
        if let Some(weight) = shading.weight(&sample) {
            let shade = weight * eval_env(env.color, Some(texture), sample.direction);
            if shade.is_finite()
                && unshadowed(scene, world, &Ray::new(pos, sample.direction))
            {
                c += shade;
            }
        }
    }

    if depth < scene.settings.max_depth {
        let sample = shading.sample(rng);
        if let Some(weight) = shading.weight(&sample) {
            let bounce = Ray::new(pos, sample.direction);
            let incoming = trace_ray(scene, world, &bounce, depth + 1, rng);
            let shade = weight * incoming;
            if shade.is_finite() {
                c += shade;
            }
        }
    }

    c
}

/// One stochastic sample of an emissive surface.
///
/// The sample point is drawn uniformly from the `2r x 2r` square in the
/// surface frame for every shape. Returns the unshadowed contribution and
/// the sampled world point, or `None` when it is zero or degenerate.
fn sample_area_light(
    surface: &Surface,
    shading: &ShadingPoint,
    rng: &mut PixelRng,
) -> Option<(Color, Vec3)> {
    let ruv = rng.next_vec2f();
    let r = surface.radius;
    let local = Vec3::new(2.0 * r * (ruv.x - 0.5), 2.0 * r * (ruv.y - 0.5), 0.0);
    let s = surface.frame.transform_point(local);
    let nl = surface.frame.transform_normal(Vec3::Z);
    let ke = surface.material.emission.eval(ruv);

    let to_light = s - shading.position;
    let dist2 = to_light.length_squared();
    if dist2 < MIN_LIGHT_DISTANCE_SQUARED {
        return None;
    }
    let l = to_light / dist2.sqrt();

    let cl = ke * surface.area() * (-nl.dot(l)).max(0.0) / dist2;
    let shade = cl * shading.brdfcos(l);
    if shade == Color::ZERO || !shade.is_finite() {
        return None;
    }
    Some((shade, s))
}

/// Apply the scene's shadow policy to a light path.
#[inline]
fn unshadowed(scene: &Scene, world: &dyn Intersector, ray: &Ray) -> bool {
    !scene.settings.shadows || !world.occluded(ray)
}
