//! Lumen Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer over the `lumen_core` scene model.
//! Direct lighting from point lights, emissive surfaces and an
//! environment map, plus one sampled indirect bounce per depth level.
//!
//! Renders are deterministic: every pixel owns a PCG stream keyed by its
//! index, so the image depends only on the scene and the seed.

mod brdf;
mod environment;
mod integrator;
mod intersect;
mod renderer;
mod rng;
mod sampling;

pub use brdf::{eval_brdf, sample_brdf, sample_cosine, BrdfSample, BRDF_EPSILON};
pub use environment::{environment_radiance, eval_env};
pub use integrator::{trace_ray, PDF_EPSILON};
pub use intersect::{Intersection, Intersector, SurfaceList};
pub use renderer::{
    color_to_rgba, image_to_rgba, linear_to_gamma, render, render_pixel, RenderError,
    RenderOptions,
};
pub use rng::{PixelRng, RngImage};
pub use sampling::{
    sample_hemisphere_cosine, sample_hemisphere_cosine_pdf, sample_hemisphere_cospower,
    sample_hemisphere_cospower_pdf,
};

/// Re-export common types from lumen_core and lumen_math
pub use lumen_core::{Color, Image, Scene};
pub use lumen_math::{Ray, Vec2, Vec3};
