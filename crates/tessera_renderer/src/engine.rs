//! Multi-threaded tiled render engine.
//!
//! A render moves through `Idle -> Rendering -> (Stopped | Completed)`.
//! Starting a render builds the camera and BVH, then hands them to a
//! coordinator thread that owns a fresh worker pool for that render only.
//! Workers claim tiles from a shared atomic counter until the tiles run out
//! or a stop is requested, and report back over a channel:
//!
//! - [`RenderEvent::Tile`] once per finished tile, in no particular order
//! - [`RenderEvent::Progress`] after every tile, as an integer percentage
//! - [`RenderEvent::Finished`] exactly once per render, after all workers exit

use crate::random::worker_rng;
use crate::scene::random_scene;
use crate::tile::{generate_tiles, render_tile, Tile, TileResult};
use crate::{Bvh, BvhError, Camera, HittableList, RenderConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lower bound on elapsed time used for throughput figures.
const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Lifecycle of a [`TiledRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderState {
    Idle = 0,
    Rendering = 1,
    Stopped = 2,
    Completed = 3,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::Rendering,
            2 => RenderState::Stopped,
            3 => RenderState::Completed,
            _ => RenderState::Idle,
        }
    }
}

/// Message sent from a running render to its consumer.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    Tile(TileResult),
    /// Completed tiles as a percentage in [0, 100].
    Progress(u8),
    Finished(RenderStats),
}

/// Aggregate figures for one render, stopped or not.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats {
    pub elapsed: Duration,
    pub samples_per_second: f64,
    pub tiles_completed: usize,
    pub total_tiles: usize,
    pub threads: usize,
    pub tile_size: u32,
    pub cancelled: bool,
}

impl RenderStats {
    /// One-line status for display layers. `repaints` is counted by the caller.
    pub fn summary(&self, repaints: u64) -> String {
        let seconds = self.elapsed.max(MIN_ELAPSED).as_secs_f64();
        format!(
            "Render {:.2}s | Repaints {} ({:.1} FPS) | Throughput {:.2} Msamples/s | Tile {}",
            self.elapsed.as_secs_f64(),
            repaints,
            repaints as f64 / seconds,
            self.samples_per_second / 1.0e6,
            self.tile_size
        )
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to build scene: {0}")]
    Scene(#[from] BvhError),

    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    #[error("failed to spawn render thread: {0}")]
    Spawn(String),
}

/// State visible to both the handle and the render threads.
struct Shared {
    state: AtomicU8,
    stop: AtomicBool,
    progress: AtomicU8,
}

impl Shared {
    fn set_state(&self, state: RenderState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Everything one render needs, borrowed read-only by every worker.
struct RenderJob {
    config: RenderConfig,
    camera: Camera,
    world: Bvh,
    tiles: Vec<Tile>,
    next_tile: AtomicUsize,
    completed_tiles: AtomicUsize,
    traced_pixels: AtomicU64,
    shared: Arc<Shared>,
}

impl RenderJob {
    /// Claim and render tiles until none are left or a stop is requested.
    fn run_worker(&self, events: Sender<RenderEvent>) {
        let mut rng = worker_rng();
        let total = self.tiles.len();

        while !self.shared.stop.load(Ordering::Acquire) {
            let index = self.next_tile.fetch_add(1, Ordering::Relaxed);
            let Some(tile) = self.tiles.get(index) else {
                break;
            };

            let result = render_tile(tile, &self.camera, &self.world, &self.config, &mut rng);
            log::trace!("Tile {} done at ({}, {})", tile.index, tile.x, tile.y);
            self.traced_pixels
                .fetch_add(tile.pixel_count() as u64, Ordering::Relaxed);
            // A dropped receiver only means nobody is watching
            let _ = events.send(RenderEvent::Tile(result));

            let done = self.completed_tiles.fetch_add(1, Ordering::AcqRel) + 1;
            let percent = (100 * done / total) as u8;
            self.shared.progress.fetch_max(percent, Ordering::Relaxed);
            let _ = events.send(RenderEvent::Progress(percent));
        }
    }

    /// Run the whole render on `pool` and report the outcome.
    fn run(self, pool: rayon::ThreadPool, events: Sender<RenderEvent>) {
        let start = Instant::now();
        let threads = pool.current_num_threads();

        pool.scope(|scope| {
            for _ in 0..threads {
                let events = events.clone();
                let job = &self;
                scope.spawn(move |_| job.run_worker(events));
            }
        });
        drop(pool);

        let elapsed = start.elapsed();
        let tiles_completed = self.completed_tiles.load(Ordering::Acquire);
        let total_tiles = self.tiles.len();
        let cancelled = tiles_completed < total_tiles;
        let samples = self.traced_pixels.load(Ordering::Relaxed)
            * self.config.samples_per_pixel as u64;

        let stats = RenderStats {
            elapsed,
            samples_per_second: samples as f64 / elapsed.max(MIN_ELAPSED).as_secs_f64(),
            tiles_completed,
            total_tiles,
            threads,
            tile_size: self.config.tile_size,
            cancelled,
        };

        if cancelled {
            log::info!("Render stopped after {}/{} tiles", tiles_completed, total_tiles);
            self.shared.set_state(RenderState::Stopped);
        } else {
            log::info!(
                "Render finished in {:.2}s ({:.2} Msamples/s)",
                elapsed.as_secs_f64(),
                stats.samples_per_second / 1.0e6
            );
            self.shared.set_state(RenderState::Completed);
        }
        let _ = events.send(RenderEvent::Finished(stats));
    }
}

/// Handle to the tiled engine.
///
/// Events for every render started through this handle arrive on the
/// receiver returned by [`TiledRenderer::new`]. Dropping the handle stops
/// any render in flight.
pub struct TiledRenderer {
    shared: Arc<Shared>,
    events: Sender<RenderEvent>,
    coordinator: Option<JoinHandle<()>>,
}

impl TiledRenderer {
    pub fn new() -> (Self, Receiver<RenderEvent>) {
        let (events, receiver) = mpsc::channel();
        let renderer = Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(RenderState::Idle as u8),
                stop: AtomicBool::new(false),
                progress: AtomicU8::new(0),
            }),
            events,
            coordinator: None,
        };
        (renderer, receiver)
    }

    pub fn state(&self) -> RenderState {
        RenderState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_rendering(&self) -> bool {
        self.state() == RenderState::Rendering
    }

    /// Last reported percentage of the current or most recent render.
    pub fn progress(&self) -> u8 {
        self.shared.progress.load(Ordering::Relaxed)
    }

    /// Render the reference scene through the reference camera.
    pub fn start(&mut self, config: RenderConfig) -> Result<(), RenderError> {
        self.reap_finished();
        if self.is_rendering() {
            log::info!("Render already in progress, ignoring start");
            return Ok(());
        }

        let config = config.sanitized();
        let mut rng = worker_rng();
        let world = random_scene(&mut rng);
        let camera = Camera::reference(config.aspect_ratio());
        self.launch(config, camera, world, &mut rng)
    }

    /// Render a caller-supplied world. The objects are wrapped in a BVH.
    pub fn start_with_scene(
        &mut self,
        config: RenderConfig,
        camera: Camera,
        world: HittableList,
    ) -> Result<(), RenderError> {
        self.reap_finished();
        if self.is_rendering() {
            log::info!("Render already in progress, ignoring start");
            return Ok(());
        }

        let mut rng = worker_rng();
        self.launch(config.sanitized(), camera, world, &mut rng)
    }

    fn launch(
        &mut self,
        config: RenderConfig,
        camera: Camera,
        world: HittableList,
        rng: &mut dyn rand::RngCore,
    ) -> Result<(), RenderError> {
        // Reap the previous, already finished, render
        self.join_coordinator();

        let world = Bvh::from_list(world, rng)?;
        let tiles = generate_tiles(config.width, config.height, config.tile_size, config.tile_order);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("tessera-worker-{}", i))
            .build()
            .map_err(|e| RenderError::ThreadPool(e.to_string()))?;

        log::info!(
            "Rendering {}x{} at {} spp, depth {}",
            config.width,
            config.height,
            config.samples_per_pixel,
            config.max_depth
        );
        log::debug!(
            "{} objects, {} BVH nodes, {} tiles of {}px, {} threads",
            world.object_count(),
            world.node_count(),
            tiles.len(),
            config.tile_size,
            config.threads
        );

        self.shared.stop.store(false, Ordering::Release);
        self.shared.progress.store(0, Ordering::Relaxed);
        self.shared.set_state(RenderState::Rendering);

        let job = RenderJob {
            config,
            camera,
            world,
            tiles,
            next_tile: AtomicUsize::new(0),
            completed_tiles: AtomicUsize::new(0),
            traced_pixels: AtomicU64::new(0),
            shared: Arc::clone(&self.shared),
        };
        let events = self.events.clone();

        let handle = std::thread::Builder::new()
            .name("tessera-render".to_string())
            .spawn(move || job.run(pool, events))
            .map_err(|e| {
                self.shared.set_state(RenderState::Idle);
                RenderError::Spawn(e.to_string())
            })?;
        self.coordinator = Some(handle);
        Ok(())
    }

    /// Ask workers to stop at their next tile claim, then wait for them.
    ///
    /// Tiles already being rendered still finish and are delivered.
    pub fn stop(&mut self) {
        if self.coordinator.is_some() {
            self.shared.stop.store(true, Ordering::Release);
        }
        self.join_coordinator();
    }

    /// Block until the current render, if any, has finished.
    pub fn wait(&mut self) {
        self.join_coordinator();
    }

    /// Join a coordinator that has already exited, so a render thread that
    /// died without reporting no longer counts as rendering.
    fn reap_finished(&mut self) {
        if self.coordinator.as_ref().is_some_and(|h| h.is_finished()) {
            self.join_coordinator();
        }
    }

    fn join_coordinator(&mut self) {
        if let Some(handle) = self.coordinator.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
                self.shared.set_state(RenderState::Idle);
            }
        }
    }
}

impl Drop for TiledRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}
