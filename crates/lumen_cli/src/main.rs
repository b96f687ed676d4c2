//! Lumen command line renderer.
//!
//! ```text
//! lumen <scene.json> [output.png|output.exr] [--resolution N] [--serial] [--seed N]
//! ```
//!
//! PNG output is gamma-corrected and clamped; EXR output keeps linear HDR
//! radiance.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lumen_core::{load_json_scene, Image, Scene};
use lumen_render::{image_to_rgba, render, RenderOptions, SurfaceList};

const USAGE: &str =
    "usage: lumen <scene.json> [output.png|output.exr] [--resolution N] [--serial] [--seed N]";

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Args {
    scene: PathBuf,
    output: PathBuf,
    resolution: Option<u32>,
    serial: bool,
    seed: u64,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut resolution = None;
    let mut serial = false;
    let mut seed = 0;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--resolution" | "-r" => {
                let value = iter.next().context("--resolution needs a value")?;
                let value: u32 = value
                    .parse()
                    .with_context(|| format!("invalid resolution '{value}'"))?;
                if value == 0 {
                    bail!("resolution must be positive");
                }
                resolution = Some(value);
            }
            "--seed" => {
                let value = iter.next().context("--seed needs a value")?;
                seed = value
                    .parse()
                    .with_context(|| format!("invalid seed '{value}'"))?;
            }
            "--serial" => serial = true,
            flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
            path => positional.push(PathBuf::from(path)),
        }
    }

    let mut positional = positional.into_iter();
    let scene = positional.next().with_context(|| USAGE.to_string())?;
    let output = positional
        .next()
        .unwrap_or_else(|| scene.with_extension("png"));
    if positional.next().is_some() {
        bail!("too many arguments\n{USAGE}");
    }

    Ok(Args {
        scene,
        output,
        resolution,
        serial,
        seed,
    })
}

/// Override the image height, keeping the camera's aspect ratio.
fn apply_resolution(scene: &mut Scene, resolution: u32) {
    let camera = &scene.camera;
    let width = (camera.width * resolution as f32 / camera.height).round() as u32;
    scene.settings.image_width = width.max(1);
    scene.settings.image_height = resolution;
}

fn save_png(image: &Image, path: &Path) -> Result<()> {
    let buffer = image::RgbaImage::from_raw(image.width, image.height, image_to_rgba(image))
        .context("image buffer size mismatch")?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn save_exr(image: &Image, path: &Path) -> Result<()> {
    let width = image.width as usize;
    let mut data: Vec<f32> = Vec::with_capacity(image.pixels.len() * 3);
    for row in image.pixels.chunks(width).rev() {
        data.extend_from_slice(bytemuck::cast_slice(row));
    }
    let buffer = image::Rgb32FImage::from_raw(image.width, image.height, data)
        .context("image buffer size mismatch")?;
    image::DynamicImage::ImageRgb32F(buffer)
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn save_image(image: &Image, path: &Path) -> Result<()> {
    let is_exr = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exr"));
    if is_exr {
        save_exr(image, path)
    } else {
        save_png(image, path)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    log::info!("Loading {}", args.scene.display());
    let mut scene = load_json_scene(&args.scene)
        .with_context(|| format!("failed to load {}", args.scene.display()))?;
    if let Some(resolution) = args.resolution {
        apply_resolution(&mut scene, resolution);
    }
    log::info!(
        "Scene: {} surfaces ({} emissive), {} point lights",
        scene.surfaces.len(),
        scene.area_light_count(),
        scene.lights.len()
    );

    let options = RenderOptions {
        parallel: !args.serial,
        seed: args.seed,
        ..Default::default()
    };
    let world = SurfaceList::from_scene(&scene);
    let image = render(&scene, &world, &options)?;

    save_image(&image, &args.output)?;
    log::info!("Wrote {}", args.output.display());

    Ok(())
}
