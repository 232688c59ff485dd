//! Image assembly for render consumers.

use crate::renderer::unpack_argb;
use crate::tile::TileResult;
use thiserror::Error;

const OPAQUE_BLACK: u32 = 0xff00_0000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramebufferError {
    #[error("tile at ({x}, {y}) size {width}x{height} exceeds {image_width}x{image_height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("expected {expected} pixels, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Packed ARGB image that tiles are copied into as they arrive.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
    coverage: Vec<u32>,
}

impl Framebuffer {
    /// Black, opaque image.
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![OPAQUE_BLACK; count],
            coverage: vec![0; count],
        }
    }

    /// Wrap a finished image such as a progressive backend's output.
    pub fn from_argb(width: u32, height: u32, pixels: &[u32]) -> Result<Self, FramebufferError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(FramebufferError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.to_vec(),
            coverage: vec![1; expected],
        })
    }

    /// Copy a rendered tile into place. Tiles may arrive in any order.
    pub fn blit(&mut self, result: &TileResult) -> Result<(), FramebufferError> {
        let tile = result.tile;
        let fits_x = tile.x.checked_add(tile.width).is_some_and(|end| end <= self.width);
        let fits_y = tile.y.checked_add(tile.height).is_some_and(|end| end <= self.height);
        if !fits_x || !fits_y {
            return Err(FramebufferError::OutOfBounds {
                x: tile.x,
                y: tile.y,
                width: tile.width,
                height: tile.height,
                image_width: self.width,
                image_height: self.height,
            });
        }
        if result.pixels.len() != tile.pixel_count() {
            return Err(FramebufferError::SizeMismatch {
                expected: tile.pixel_count(),
                actual: result.pixels.len(),
            });
        }
        if tile.width == 0 {
            return Ok(());
        }

        let stride = self.width as usize;
        for (row, src) in result.pixels.chunks_exact(tile.width as usize).enumerate() {
            let start = (tile.y as usize + row) * stride + tile.x as usize;
            let end = start + src.len();
            self.pixels[start..end].copy_from_slice(src);
            for count in &mut self.coverage[start..end] {
                *count += 1;
            }
        }
        Ok(())
    }

    /// How many tile pixels have landed on each image pixel.
    pub fn coverage(&self) -> &[u32] {
        &self.coverage
    }

    /// True when every pixel was written exactly once.
    pub fn is_exactly_covered(&self) -> bool {
        self.coverage.iter().all(|&n| n == 1)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// RGBA bytes, row 0 first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&p| unpack_argb(p)).collect()
    }
}
