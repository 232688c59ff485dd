//! Tessera - CPU Path Tracing
//!
//! A Monte Carlo path tracer with a BVH, three materials, a thin-lens
//! camera, and a tiled multi-threaded render engine. Progressive backends
//! (including GPU ones living outside this crate) share the
//! [`ProgressiveBackend`] contract.

pub mod random;

mod hittable;
mod material;
mod sphere;
mod camera;
mod bvh;
mod renderer;
mod tile;
mod scene;
mod engine;
mod backend;
mod framebuffer;

pub use hittable::{HitRecord, Hittable, HittableList};
pub use material::{Color, Dielectric, Lambertian, Material, Metal, ScatterResult};
pub use sphere::Sphere;
pub use camera::{Camera, CameraBuilder};
pub use bvh::{Bvh, BvhChild, BvhError, BvhNode};
pub use renderer::{
    linear_to_gamma, pack_argb, ray_color, render_pixel, sky_gradient, unpack_argb, RenderConfig,
    TileOrder, MAX_DEPTH_LIMIT, MIN_TILE_SIZE,
};
pub use tile::{generate_tiles, render_tile, Tile, TileResult};
pub use scene::random_scene;
pub use engine::{RenderError, RenderEvent, RenderState, RenderStats, TiledRenderer};
pub use backend::{select_backend, BackendError, PreviewBackend, ProgressiveBackend};
pub use framebuffer::{Framebuffer, FramebufferError};

/// Re-export common math types from tessera_math
pub use tessera_math::{Aabb, Interval, Point3, Ray, Vec3};
