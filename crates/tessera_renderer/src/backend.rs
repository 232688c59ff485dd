//! Progressive accumulation backends.
//!
//! A progressive backend renders the whole frame once per call and folds
//! that one sample per pixel into a running mean, so the image converges
//! the longer it runs. GPU implementations live outside this crate; any
//! type implementing [`ProgressiveBackend`] can be offered to
//! [`select_backend`], which falls back through the candidates in order.

use crate::renderer::MAX_DEPTH_LIMIT;
use rayon::prelude::*;
use tessera_math::{Point3, Vec3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid framebuffer size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("backend used before initialize")]
    NotInitialized,

    #[error("no progressive backend could be initialized")]
    NoBackend,
}

/// Contract shared by every progressive renderer.
pub trait ProgressiveBackend: Send {
    fn name(&self) -> &str;

    /// Allocate buffers for a `width` x `height` image and clear accumulation.
    fn initialize(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Accumulate one more sample per pixel with at most `max_depth` bounces.
    fn render_frame(&mut self, max_depth: u32) -> Result<(), BackendError>;

    /// Latest tone-mapped image as packed `0xAARRGGBB`, row 0 at the top.
    fn host_pixels(&self) -> &[u32];

    /// Frames accumulated since the last reset.
    fn frame_index(&self) -> u32;

    fn reset_accumulation(&mut self);
}

/// Try each candidate in order and return the first that initializes.
///
/// A failed candidate is logged and dropped; it is not retried.
pub fn select_backend(
    candidates: Vec<Box<dyn ProgressiveBackend>>,
    width: u32,
    height: u32,
) -> Result<Box<dyn ProgressiveBackend>, BackendError> {
    for mut backend in candidates {
        match backend.initialize(width, height) {
            Ok(()) => {
                log::info!("Using {} backend at {}x{}", backend.name(), width, height);
                return Ok(backend);
            }
            Err(err) => log::warn!("{} backend failed to initialize: {}", backend.name(), err),
        }
    }
    Err(BackendError::NoBackend)
}

struct PreviewSphere {
    center: Point3,
    radius: f64,
    albedo: Vec3,
}

const PREVIEW_SCENE: [PreviewSphere; 4] = [
    PreviewSphere {
        center: Point3::new(0.0, -100.5, -1.0),
        radius: 100.0,
        albedo: Vec3::new(0.8, 0.8, 0.0),
    },
    PreviewSphere {
        center: Point3::new(0.0, 0.0, -1.0),
        radius: 0.5,
        albedo: Vec3::new(0.75, 0.75, 0.75),
    },
    PreviewSphere {
        center: Point3::new(-1.0, 0.0, -1.4),
        radius: 0.5,
        albedo: Vec3::new(0.8, 0.3, 0.3),
    },
    PreviewSphere {
        center: Point3::new(1.0, 0.0, -1.2),
        radius: 0.5,
        albedo: Vec3::new(0.3, 0.8, 0.3),
    },
];

const PREVIEW_EYE: Point3 = Point3::new(0.0, 0.3, 1.2);
const SURFACE_OFFSET: f64 = 0.001;

/// The hash maps 0 to itself, which would pin every draw at 0.0.
const ZERO_SEED_FALLBACK: u32 = 0x9e37_79b9;

/// Integer-hash generator; the whole sequence is fixed by its seed.
///
/// The hash is a bijection fixing only 0, so a nonzero state stays nonzero.
struct HashRng(u32);

impl HashRng {
    fn for_pixel(pixel: u32, frame: u32) -> Self {
        let seed = pixel
            .wrapping_mul(9781)
            .wrapping_add(frame.wrapping_add(1).wrapping_mul(6271));
        match seed {
            0 => Self(ZERO_SEED_FALLBACK),
            s => Self(s),
        }
    }

    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x >> 16;
        x = x.wrapping_mul(0x7feb_352d);
        x ^= x >> 15;
        x = x.wrapping_mul(0x846c_a68b);
        x ^= x >> 16;
        self.0 = x;
        x as f64 / u32::MAX as f64
    }

    fn in_unit_sphere(&mut self) -> Vec3 {
        loop {
            let p = Vec3::new(self.next_f64(), self.next_f64(), self.next_f64()) * 2.0 - Vec3::ONE;
            if p.length_squared() < 1.0 {
                return p;
            }
        }
    }
}

/// Nearest hit in the fixed scene as `(t, outward normal, albedo)`.
fn hit_preview_scene(origin: Point3, direction: Vec3) -> Option<(f64, Vec3, Vec3)> {
    let mut best: Option<(f64, Vec3, Vec3)> = None;

    for sphere in &PREVIEW_SCENE {
        let oc = origin - sphere.center;
        let a = direction.length_squared();
        let half_b = oc.dot(direction);
        let c = oc.length_squared() - sphere.radius * sphere.radius;
        let discriminant = half_b * half_b - a * c;
        if discriminant < 0.0 {
            continue;
        }

        let sqrtd = discriminant.sqrt();
        let near = (-half_b - sqrtd) / a;
        let t = if near > SURFACE_OFFSET { near } else { (-half_b + sqrtd) / a };
        if t <= SURFACE_OFFSET || best.is_some_and(|(best_t, _, _)| t >= best_t) {
            continue;
        }

        let normal = (origin + t * direction - sphere.center).normalize();
        best = Some((t, normal, sphere.albedo));
    }

    best
}

/// Iterative diffuse path through the fixed scene.
fn trace_preview(mut origin: Point3, mut direction: Vec3, max_depth: u32, rng: &mut HashRng) -> Vec3 {
    let mut throughput = Vec3::ONE;

    for _ in 0..max_depth {
        let Some((t, normal, albedo)) = hit_preview_scene(origin, direction) else {
            let unit = direction.normalize();
            let a = 0.5 * (unit.y + 1.0);
            let sky = (1.0 - a) * Vec3::ONE + a * Vec3::new(0.5, 0.7, 1.0);
            return throughput * sky;
        };

        let hit = origin + t * direction;
        let bounce = normal + rng.in_unit_sphere();
        direction = if bounce.length_squared() > 1e-12 { bounce.normalize() } else { normal };
        origin = hit + normal * SURFACE_OFFSET;
        throughput *= albedo;
    }

    Vec3::ZERO
}

fn to_unorm8(c: f64) -> u32 {
    (c.clamp(0.0, 1.0).sqrt() * 255.0).round() as u32
}

/// CPU rendition of the reduced GPU scene: four diffuse spheres, brute-force
/// intersection, fixed pinhole camera, one sample per pixel per frame.
///
/// Random numbers depend only on pixel and frame index, so two backends fed
/// the same calls produce the same pixels.
#[derive(Debug, Default)]
pub struct PreviewBackend {
    width: u32,
    height: u32,
    accum: Vec<Vec3>,
    pixels: Vec<u32>,
    frame_index: u32,
}

impl PreviewBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Running mean for every pixel, before tone mapping.
    pub fn accumulation(&self) -> &[Vec3] {
        &self.accum
    }
}

/// One sample for pixel `(x, y)` of frame `frame`.
fn preview_sample(x: u32, y: u32, width: u32, height: u32, frame: u32, max_depth: u32) -> Vec3 {
    let mut rng = HashRng::for_pixel(y.wrapping_mul(width).wrapping_add(x), frame);
    let row = (height - 1 - y) as f64;
    let u = (x as f64 + rng.next_f64()) / width.saturating_sub(1).max(1) as f64;
    let v = (row + rng.next_f64()) / height.saturating_sub(1).max(1) as f64;

    let aspect = width as f64 / height as f64;
    let lower_left = Vec3::new(-aspect, -1.0, -1.0);
    let horizontal = Vec3::new(2.0 * aspect, 0.0, 0.0);
    let vertical = Vec3::new(0.0, 2.0, 0.0);
    let direction = (lower_left + u * horizontal + v * vertical - PREVIEW_EYE).normalize();

    trace_preview(PREVIEW_EYE, direction, max_depth, &mut rng)
}

impl ProgressiveBackend for PreviewBackend {
    fn name(&self) -> &str {
        "cpu-preview"
    }

    fn initialize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::InvalidSize { width, height });
        }

        let count = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.accum = vec![Vec3::ZERO; count];
        self.pixels = vec![0xff00_0000; count];
        self.frame_index = 0;
        Ok(())
    }

    fn render_frame(&mut self, max_depth: u32) -> Result<(), BackendError> {
        if self.accum.is_empty() {
            return Err(BackendError::NotInitialized);
        }

        let (width, height, frame) = (self.width, self.height, self.frame_index);
        let max_depth = max_depth.clamp(1, MAX_DEPTH_LIMIT);
        let previous = frame as f64;

        self.accum
            .par_chunks_mut(width as usize)
            .zip(self.pixels.par_chunks_mut(width as usize))
            .enumerate()
            .for_each(|(y, (accum_row, pixel_row))| {
                for (x, (accum, pixel)) in accum_row.iter_mut().zip(pixel_row.iter_mut()).enumerate() {
                    let sample = preview_sample(x as u32, y as u32, width, height, frame, max_depth);
                    *accum = (*accum * previous + sample) / (previous + 1.0);
                    *pixel = (0xff << 24)
                        | (to_unorm8(accum.x) << 16)
                        | (to_unorm8(accum.y) << 8)
                        | to_unorm8(accum.z);
                }
            });

        self.frame_index += 1;
        Ok(())
    }

    fn host_pixels(&self) -> &[u32] {
        &self.pixels
    }

    fn frame_index(&self) -> u32 {
        self.frame_index
    }

    fn reset_accumulation(&mut self) {
        self.accum.fill(Vec3::ZERO);
        self.pixels.fill(0xff00_0000);
        self.frame_index = 0;
    }
}
