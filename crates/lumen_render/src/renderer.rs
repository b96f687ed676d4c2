//! Image rendering driver.
//!
//! Implements:
//! - Stratified S x S jittered sub-samples per pixel
//! - Static row striping across a fixed pool of workers
//! - Display conversion (gamma 2.0, 8-bit)
//!
//! Worker `k` of `P` renders rows `k, k + P, k + 2P, ...`. Each worker is
//! handed exclusive slices of its rows' pixels and random streams when it
//! is spawned, so no two workers touch the same pixel or stream and no
//! locking is needed. The scene and intersector are shared read-only.

use std::time::Instant;

use lumen_core::{Color, Image, Scene, SceneError};
use thiserror::Error;

use crate::integrator::trace_ray;
use crate::intersect::Intersector;
use crate::rng::{PixelRng, RngImage};

/// Errors that can occur before rendering starts.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid scene: {0}")]
    InvalidScene(#[from] SceneError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Driver configuration. Scene-level settings live in `RenderSettings`.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Render with a worker pool instead of on the calling thread
    pub parallel: bool,
    /// Worker count; defaults to the hardware concurrency
    pub threads: Option<usize>,
    /// Selects the family of per-pixel random streams
    pub seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            seed: 0,
        }
    }
}

impl RenderOptions {
    /// Single-threaded rendering on the calling thread.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Number of workers this configuration renders with.
    pub fn worker_count(&self) -> usize {
        if self.parallel {
            self.threads
                .unwrap_or_else(rayon::current_num_threads)
                .max(1)
        } else {
            1
        }
    }
}

/// Render a single pixel with S x S stratified sub-samples.
///
/// Each sub-sample is jittered inside its stratum with two draws from
/// `rng`, traced from the camera, and the results are averaged.
pub fn render_pixel(
    scene: &Scene,
    world: &dyn Intersector,
    i: u32,
    j: u32,
    rng: &mut PixelRng,
) -> Color {
    let settings = &scene.settings;
    let samples = settings.samples;
    let (width, height) = (settings.image_width as f32, settings.image_height as f32);

    let mut pixel_color = Color::ZERO;
    for jj in 0..samples {
        for ii in 0..samples {
            let u = (i as f32 + (ii as f32 + rng.next_float()) / samples as f32) / width;
            let v = (j as f32 + (jj as f32 + rng.next_float()) / samples as f32) / height;
            let ray = scene.camera.generate_ray(u, v);
            pixel_color += trace_ray(scene, world, &ray, 0, rng);
        }
    }

    pixel_color / (samples * samples) as f32
}

/// One image row handed to a worker.
struct RowTask<'a> {
    row: u32,
    pixels: &'a mut [Color],
    rngs: &'a mut [PixelRng],
}

/// Render every row of a stripe. Only the reporting worker logs progress.
fn render_stripe(scene: &Scene, world: &dyn Intersector, stripe: Vec<RowTask<'_>>, report: bool) {
    let height = scene.settings.image_height;
    for task in stripe {
        if report {
            log::debug!("rendering row {:03}/{:03}", task.row, height);
        }
        for (i, (pixel, rng)) in task.pixels.iter_mut().zip(task.rngs.iter_mut()).enumerate() {
            *pixel = render_pixel(scene, world, i as u32, task.row, rng);
        }
    }
}

/// Split rows into `workers` stripes: row `j` goes to stripe `j % workers`.
fn stripe_rows<'a>(
    image: &'a mut Image,
    rngs: &'a mut RngImage,
    workers: usize,
) -> Vec<Vec<RowTask<'a>>> {
    let width = image.width as usize;
    let mut stripes: Vec<Vec<RowTask<'a>>> = (0..workers).map(|_| Vec::new()).collect();
    for (j, (pixels, rng_row)) in image.pixels.chunks_mut(width).zip(rngs.rows_mut()).enumerate() {
        stripes[j % workers].push(RowTask {
            row: j as u32,
            pixels,
            rngs: rng_row,
        });
    }
    stripes
}

/// Render the scene to an HDR image.
///
/// Row `j` of the result is sensor height `v = (j + 0.5) / height`, so row
/// 0 is the bottom of the image. The output depends only on the scene and
/// `options.seed`: serial and parallel renders are bit-identical.
pub fn render(
    scene: &Scene,
    world: &dyn Intersector,
    options: &RenderOptions,
) -> Result<Image, RenderError> {
    scene.validate()?;

    let settings = &scene.settings;
    let mut image = Image::new(settings.image_width, settings.image_height);
    let mut rngs = RngImage::new(settings.image_width, settings.image_height, options.seed);
    let workers = options.worker_count();

    log::info!(
        "Rendering {}x{} @ {}x{} samples, depth {}, {} worker(s)",
        settings.image_width,
        settings.image_height,
        settings.samples,
        settings.samples,
        settings.max_depth,
        workers
    );
    let start = Instant::now();

    let stripes = stripe_rows(&mut image, &mut rngs, workers);
    if workers == 1 {
        for stripe in stripes {
            render_stripe(scene, world, stripe, true);
        }
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|k| format!("lumen-worker-{k}"))
            .build()?;
        pool.scope(|s| {
            for (k, stripe) in stripes.into_iter().enumerate() {
                s.spawn(move |_| render_stripe(scene, world, stripe, k == 0));
            }
        });
    }

    log::info!("Rendered in {:.2?}", start.elapsed());
    Ok(image)
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))) as u8;
    [r, g, b, 255]
}

/// Convert to top-down RGBA bytes (for display or saving).
pub fn image_to_rgba(image: &Image) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(image.pixels.len() * 4);
    for row in image.pixels.chunks(image.width as usize).rev() {
        for color in row {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::SurfaceList;
    use lumen_core::{Camera, Environment, Material, PointLight, Surface};
    use lumen_math::{Frame, Vec3};
    use std::f32::consts::PI;
    use std::sync::Arc;

    /// Diffuse floor with a point light, an area light, a glossy sphere
    /// and a sky, so every estimator term draws random numbers.
    fn test_scene(width: u32, height: u32) -> Scene {
        let mut scene = Scene::new(Camera::look_at(
            Vec3::new(0.0, 2.0, 4.0),
            Vec3::ZERO,
            Vec3::Y,
            1.0,
            height as f32 / width as f32,
        ));
        scene.add_surface(Surface::quad(
            Frame::from_origin_z(Vec3::ZERO, Vec3::Y),
            5.0,
            Arc::new(Material::diffuse(Vec3::splat(0.6))),
        ));
        scene.add_surface(Surface::sphere(
            Frame::from_origin(Vec3::new(0.0, 0.5, 0.0)),
            0.5,
            Arc::new(Material::diffuse(Vec3::splat(0.2)).with_specular(Vec3::splat(0.3), 40.0)),
        ));
        scene.add_surface(Surface::quad(
            Frame::from_origin_z(Vec3::new(1.0, 3.0, 0.0), -Vec3::Y),
            0.5,
            Arc::new(Material::emissive(Vec3::splat(8.0))),
        ));
        scene.add_light(PointLight::new(Vec3::new(-2.0, 3.0, 1.0), Vec3::splat(6.0)));
        scene.environment = Environment::new(
            Vec3::splat(0.5),
            Some(Arc::new(Image::filled(8, 4, Vec3::ONE))),
        );
        scene.ambient = Vec3::splat(0.02);
        scene.settings.image_width = width;
        scene.settings.image_height = height;
        scene.settings.samples = 2;
        scene.settings.max_depth = 2;
        scene
    }

    fn bits(image: &Image) -> Vec<[u32; 3]> {
        image
            .pixels
            .iter()
            .map(|c| [c.x.to_bits(), c.y.to_bits(), c.z.to_bits()])
            .collect()
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Vec3::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Vec3::splat(4.0)), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Vec3::new(0.25, -1.0, 1.0)), [127, 0, 255, 255]);
    }

    #[test]
    fn test_image_to_rgba_is_top_down() {
        let mut image = Image::new(1, 2);
        image.set(0, 1, Vec3::ONE); // top row
        let bytes = image_to_rgba(&image);
        assert_eq!(&bytes[0..4], &[255, 255, 255, 255]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_stripe_rows_round_robin() {
        let mut image = Image::new(3, 7);
        let mut rngs = RngImage::new(3, 7, 0);
        let stripes = stripe_rows(&mut image, &mut rngs, 3);

        let rows: Vec<Vec<u32>> = stripes
            .iter()
            .map(|s| s.iter().map(|t| t.row).collect())
            .collect();
        assert_eq!(rows, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
        assert!(stripes.iter().flatten().all(|t| t.pixels.len() == 3 && t.rngs.len() == 3));
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(RenderOptions::serial().worker_count(), 1);
        let options = RenderOptions {
            threads: Some(3),
            ..Default::default()
        };
        assert_eq!(options.worker_count(), 3);
        let options = RenderOptions {
            threads: Some(0),
            ..Default::default()
        };
        assert_eq!(options.worker_count(), 1);
    }

    #[test]
    fn test_point_light_over_plane_end_to_end() {
        // Tiny sensor: every sub-sample hits the floor right below the camera
        let mut scene = Scene::new(Camera::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            1e-4,
            1e-4,
        ));
        let kd = 0.5;
        scene.add_surface(Surface::quad(
            Frame::IDENTITY,
            10.0,
            Arc::new(Material::diffuse(Vec3::splat(kd))),
        ));
        scene.add_light(PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::splat(10.0)));
        scene.ambient = Vec3::splat(0.1);
        scene.settings.image_width = 1;
        scene.settings.image_height = 1;
        scene.settings.samples = 2;
        scene.settings.max_depth = 0;
        scene.settings.shadows = false;

        let world = SurfaceList::from_scene(&scene);
        let image = render(&scene, &world, &RenderOptions::serial()).unwrap();

        let expected = 0.1 * kd + 10.0 / 4.0 * kd / PI;
        let c = image.at(0, 0);
        assert!((c - Vec3::splat(expected)).abs().max_element() < 1e-4, "{c:?}");
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = test_scene(12, 8);
        let world = SurfaceList::from_scene(&scene);

        let a = render(&scene, &world, &RenderOptions::serial()).unwrap();
        let b = render(&scene, &world, &RenderOptions::serial()).unwrap();
        assert_eq!(bits(&a), bits(&b));
        assert!(a.pixels.iter().all(|c| c.is_finite() && c.min_element() >= 0.0));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let scene = test_scene(12, 9);
        let world = SurfaceList::from_scene(&scene);

        let serial = render(&scene, &world, &RenderOptions::serial()).unwrap();
        for threads in [2, 4] {
            let options = RenderOptions {
                parallel: true,
                threads: Some(threads),
                seed: 0,
            };
            let parallel = render(&scene, &world, &options).unwrap();
            assert_eq!(bits(&serial), bits(&parallel), "{threads} threads");
        }
    }

    #[test]
    fn test_seed_changes_image() {
        let scene = test_scene(6, 6);
        let world = SurfaceList::from_scene(&scene);

        let a = render(&scene, &world, &RenderOptions::serial()).unwrap();
        let options = RenderOptions {
            seed: 1,
            ..RenderOptions::serial()
        };
        let b = render(&scene, &world, &options).unwrap();
        assert_ne!(bits(&a), bits(&b));
    }

    #[test]
    fn test_render_pixel_averages_samples() {
        // Constant sky, nothing to hit: every sub-sample sees the same value
        let mut scene = Scene::default();
        scene.environment = Environment::new(
            Vec3::splat(0.75),
            Some(Arc::new(Image::filled(1, 1, Vec3::ONE))),
        );
        scene.settings.samples = 3;
        let world = SurfaceList::from_scene(&scene);

        let mut rng = PixelRng::new(0, 0);
        let c = render_pixel(&scene, &world, 5, 7, &mut rng);
        assert!((c - Vec3::splat(0.75)).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_render_rejects_invalid_scene() {
        let mut scene = Scene::default();
        scene.settings.image_height = 0;
        let world = SurfaceList::from_scene(&scene);
        let result = render(&scene, &world, &RenderOptions::default());
        assert!(matches!(result, Err(RenderError::InvalidScene(SceneError::EmptyImage { .. }))));
    }
}
