//! Per-pixel random streams.
//!
//! Every pixel owns one independent stream for the whole render, so its
//! value depends only on its own draws no matter which worker renders it.

use lumen_math::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

/// PCG's default initial state, offset by the render seed.
const PCG_DEFAULT_STATE: u64 = 0xcafe_f00d_d15e_a5e5;

/// A reproducible stream of uniform samples owned by one pixel.
#[derive(Clone, Debug)]
pub struct PixelRng {
    rng: Pcg32,
}

impl PixelRng {
    /// Stream `stream` of the generator family selected by `seed`.
    pub fn new(seed: u64, stream: u64) -> Self {
        Self {
            rng: Pcg32::new(PCG_DEFAULT_STATE.wrapping_add(seed), stream),
        }
    }

    /// Uniform scalar in [0, 1).
    #[inline]
    pub fn next_float(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform pair in [0, 1)^2.
    #[inline]
    pub fn next_vec2f(&mut self) -> Vec2 {
        let x = self.next_float();
        let y = self.next_float();
        Vec2::new(x, y)
    }
}

/// One `PixelRng` per pixel, row-major like `Image`.
#[derive(Clone, Debug)]
pub struct RngImage {
    pub width: u32,
    pub height: u32,
    rngs: Vec<PixelRng>,
}

impl RngImage {
    /// Seed one stream per pixel; the stream id is the pixel index.
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        let count = width as u64 * height as u64;
        Self {
            width,
            height,
            rngs: (0..count).map(|idx| PixelRng::new(seed, idx)).collect(),
        }
    }

    /// Disjoint mutable rows, bottom to top.
    pub fn rows_mut(&mut self) -> std::slice::ChunksMut<'_, PixelRng> {
        self.rngs.chunks_mut(self.width as usize)
    }
}
