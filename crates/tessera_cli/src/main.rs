//! Headless tessera renderer.
//!
//! Renders the reference scene with the tiled engine and writes
//! `render.png`. Set `TESSERA_BACKEND=preview` to run the progressive
//! preview backend instead (writes `preview.png`), and `TESSERA_CONFIG` to
//! a JSON file to override the render settings.

use anyhow::{Context, Result};
use std::path::Path;
use tessera_renderer::{
    select_backend, Framebuffer, PreviewBackend, ProgressiveBackend, RenderConfig, RenderEvent,
    TiledRenderer,
};

const CONFIG_ENV: &str = "TESSERA_CONFIG";
const BACKEND_ENV: &str = "TESSERA_BACKEND";

fn load_config() -> Result<RenderConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(RenderConfig::default());
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: RenderConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path))?;
    log::info!("Loaded config from {}", path);
    Ok(config)
}

fn save_png(framebuffer: &Framebuffer, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(
        framebuffer.width,
        framebuffer.height,
        framebuffer.to_rgba8(),
    )
    .context("Framebuffer size does not match its pixel data")?;

    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn render_tiled(config: RenderConfig) -> Result<()> {
    let config = config.sanitized();
    let (mut renderer, events) = TiledRenderer::new();
    let mut framebuffer = Framebuffer::new(config.width, config.height);

    renderer
        .start(config)
        .context("Failed to start render")?;

    let mut repaints = 0u64;
    let mut next_report = 10u8;
    for event in events.iter() {
        match event {
            RenderEvent::Tile(result) => {
                if let Err(err) = framebuffer.blit(&result) {
                    log::warn!("Dropping tile {}: {}", result.tile.index, err);
                } else {
                    repaints += 1;
                }
            }
            RenderEvent::Progress(percent) => {
                if percent >= next_report {
                    log::info!("Progress {}%", percent);
                    next_report = (percent / 10 + 1) * 10;
                }
            }
            RenderEvent::Finished(stats) => {
                if stats.cancelled {
                    log::warn!(
                        "Render stopped with {}/{} tiles",
                        stats.tiles_completed,
                        stats.total_tiles
                    );
                }
                log::info!("{}", stats.summary(repaints));
                break;
            }
        }
    }
    renderer.wait();

    save_png(&framebuffer, Path::new("render.png"))
}

fn render_preview(config: RenderConfig) -> Result<()> {
    let config = config.sanitized();
    let candidates: Vec<Box<dyn ProgressiveBackend>> = vec![Box::new(PreviewBackend::new())];
    let mut backend = select_backend(candidates, config.width, config.height)
        .context("No progressive backend available")?;

    for _ in 0..config.samples_per_pixel {
        backend
            .render_frame(config.max_depth)
            .with_context(|| format!("{} frame failed", backend.name()))?;
    }
    log::info!("Accumulated {} frames", backend.frame_index());

    let framebuffer = Framebuffer::from_argb(config.width, config.height, backend.host_pixels())?;
    save_png(&framebuffer, Path::new("preview.png"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting tessera");
    let config = load_config()?;

    match std::env::var(BACKEND_ENV).as_deref() {
        Ok("preview") => render_preview(config),
        _ => render_tiled(config),
    }
}
