//! Per-pixel path tracing.
//!
//! Implements Monte Carlo path tracing with:
//! - Recursive ray tracing with a bounce limit
//! - Sky gradient background
//! - Anti-aliasing via jittered multi-sampling
//! - Square-root tone mapping into packed ARGB

use crate::{Camera, Color, Hittable};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tessera_math::{Interval, Ray};

use crate::random::random_f64;

/// Upper bound applied to `max_depth`.
pub const MAX_DEPTH_LIMIT: u32 = 64;

/// Smallest tile edge the engine accepts.
pub const MIN_TILE_SIZE: u32 = 8;

/// Self-intersection guard for secondary rays.
const T_MIN: f64 = 0.001;

/// Display range after tone mapping; 0.999 keeps `256 * c` below 256.
const INTENSITY: Interval = Interval::new(0.0, 0.999);

/// Order in which tile indices map onto image rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileOrder {
    /// Row by row from the top-left corner.
    #[default]
    Raster,
    /// Nearest to the image center first.
    Spiral,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Edge length of a square tile
    pub tile_size: u32,
    pub tile_order: TileOrder,
    /// Worker thread count
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            samples_per_pixel: 10,
            max_depth: 10,
            tile_size: 16,
            tile_order: TileOrder::Raster,
            threads: default_threads(),
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_samples(mut self, samples_per_pixel: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_tile_order(mut self, tile_order: TileOrder) -> Self {
        self.tile_order = tile_order;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Copy with every field forced into the range the engine supports.
    pub fn sanitized(&self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
            samples_per_pixel: self.samples_per_pixel.max(1),
            max_depth: self.max_depth.clamp(1, MAX_DEPTH_LIMIT),
            tile_size: self.tile_size.max(MIN_TILE_SIZE),
            tile_order: self.tile_order,
            threads: self.threads.max(1),
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width.max(1) as f64 / self.height.max(1) as f64
    }

    /// Total camera rays traced for one full frame.
    pub fn total_samples(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.samples_per_pixel as u64
    }
}

/// Compute the color seen by a ray.
///
/// Depth 0 contributes no light. Otherwise the nearest hit either scatters
/// (attenuation times the color of the scattered ray) or absorbs (black);
/// misses see the sky.
pub fn ray_color(ray: &Ray, world: &dyn Hittable, depth: u32, rng: &mut dyn RngCore) -> Color {
    if depth == 0 {
        return Color::ZERO;
    }

    let Some(rec) = world.hit(ray, Interval::new(T_MIN, f64::INFINITY)) else {
        return sky_gradient(ray);
    };

    match rec.material.scatter(ray, &rec, rng) {
        Some(result) => result.attenuation * ray_color(&result.scattered, world, depth - 1, rng),
        None => Color::ZERO,
    }
}

/// White at the horizon blending to light blue straight up.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    (1.0 - a) * Color::ONE + a * Color::new(0.5, 0.7, 1.0)
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Tone map a linear color and pack it as `0xAARRGGBB` with opaque alpha.
pub fn pack_argb(color: Color) -> u32 {
    let channel = |c: f64| (256.0 * INTENSITY.clamp(linear_to_gamma(c))) as u32;
    (255 << 24) | (channel(color.x) << 16) | (channel(color.y) << 8) | channel(color.z)
}

/// Split a packed pixel into `[r, g, b, a]` bytes.
pub fn unpack_argb(pixel: u32) -> [u8; 4] {
    let [a, r, g, b] = pixel.to_be_bytes();
    [r, g, b, a]
}

/// Average `samples_per_pixel` jittered samples for pixel `(x, y)`.
///
/// Row 0 is the top of the image. A one-pixel-wide or one-pixel-high image
/// divides by 1 instead of 0.
pub fn render_pixel(
    camera: &Camera,
    world: &dyn Hittable,
    x: u32,
    y: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let u_denom = config.width.saturating_sub(1).max(1) as f64;
    let v_denom = config.height.saturating_sub(1).max(1) as f64;
    let row = config.height.saturating_sub(1).saturating_sub(y) as f64;

    let samples = config.samples_per_pixel.max(1);
    let mut pixel_color = Color::ZERO;
    for _ in 0..samples {
        let u = (x as f64 + random_f64(rng)) / u_denom;
        let v = (row + random_f64(rng)) / v_denom;
        let ray = camera.get_ray(u, v, rng);
        pixel_color += ray_color(&ray, world, config.max_depth, rng);
    }

    pixel_color / samples as f64
}
