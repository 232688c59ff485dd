//! Tile partitioning for the parallel renderer.
//!
//! Divides the image into square tiles that workers claim and render
//! independently. Tiles on the right and bottom edges are clipped to the
//! image bounds.

use crate::renderer::{pack_argb, render_pixel};
use crate::{Camera, Hittable, RenderConfig, TileOrder};
use rand::RngCore;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner (row 0 is the top)
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position of this tile in claim order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self { x, y, width, height, index }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Generate tiles covering a `width` x `height` image.
///
/// Indices are dense from 0 in the requested order.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32, order: TileOrder) -> Vec<Tile> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let tw = tile_size.min(width - x);
            let th = tile_size.min(height - y);
            tiles.push(Tile::new(x, y, tw, th, tiles.len()));
            x += tile_size;
        }
        y += tile_size;
    }

    if order == TileOrder::Spiral {
        sort_spiral(&mut tiles, width, height);
        for (i, tile) in tiles.iter_mut().enumerate() {
            tile.index = i;
        }
    }

    tiles
}

/// Sort tiles by distance of their center from the image center.
///
/// The sort is stable, so equidistant tiles keep raster order.
fn sort_spiral(tiles: &mut [Tile], width: u32, height: u32) {
    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;
    let distance = |t: &Tile| {
        let dx = t.x as f64 + t.width as f64 / 2.0 - center_x;
        let dy = t.y as f64 + t.height as f64 / 2.0 - center_y;
        dx * dx + dy * dy
    };

    tiles.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Render one tile into packed ARGB pixels, row-major within the tile.
pub fn render_tile(
    tile: &Tile,
    camera: &Camera,
    world: &dyn Hittable,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> TileResult {
    let mut pixels = Vec::with_capacity(tile.pixel_count());

    for local_y in 0..tile.height {
        for local_x in 0..tile.width {
            let color = render_pixel(camera, world, tile.x + local_x, tile.y + local_y, config, rng);
            pixels.push(pack_argb(color));
        }
    }

    TileResult::new(*tile, pixels)
}

/// Result of rendering a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResult {
    pub tile: Tile,
    /// Packed `0xAARRGGBB` pixels, `tile.width * tile.height` of them
    pub pixels: Vec<u32>,
}

impl TileResult {
    pub fn new(tile: Tile, pixels: Vec<u32>) -> Self {
        Self { tile, pixels }
    }
}
