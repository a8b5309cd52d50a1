// SPDX-License-Identifier: GPL-3.0-or-later
//! Synthetic frames for exercising trackers: squares over a flat background, and plain noise.
use image::Luma;
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};

use crate::geometry::Region;
use crate::image_buffer::GrayFrame;

pub(crate) const WIDTH: u32 = 160;
pub(crate) const HEIGHT: u32 = 120;
pub(crate) const BACKGROUND: u8 = 40;
pub(crate) const SQUARE_SIZE: u32 = 24;
/// Side length of each flat block in a square's texture.
const BLOCK_SIZE: u32 = 3;
const BLOCKS: u32 = SQUARE_SIZE / BLOCK_SIZE;

/// A bright square moving at a constant velocity. Squares have a blocky random texture unless
/// made [`uniform`](MovingSquare::uniform).
#[derive(Clone, Debug)]
pub(crate) struct MovingSquare {
    pub(crate) start_x: f64,
    pub(crate) start_y: f64,
    pub(crate) velocity_x: f64,
    pub(crate) velocity_y: f64,
    /// Added to the whole square's brightness each frame.
    pub(crate) brightness_drift: f64,
    /// Base brightness of each texture block, in `[100, 200]`.
    blocks: Vec<u8>,
}

impl MovingSquare {
    pub(crate) fn new(start_x: f64, start_y: f64, velocity_x: f64, velocity_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            velocity_x,
            velocity_y,
            brightness_drift: 0.0,
            blocks: Vec::new(),
        }
        .with_pattern(0)
    }

    /// Regenerate the texture from a seed so two squares don't look alike.
    pub(crate) fn with_pattern(mut self, pattern: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(pattern);
        self.blocks = (0..BLOCKS * BLOCKS)
            .map(|_| 100 + (rng.next_u32() % 101) as u8)
            .collect();
        self
    }

    /// Drop the texture, leaving a flat square of the given brightness.
    pub(crate) fn uniform(mut self, brightness: u8) -> Self {
        self.blocks = vec![brightness; self.blocks.len()];
        self
    }

    pub(crate) fn with_drift(mut self, brightness_drift: f64) -> Self {
        self.brightness_drift = brightness_drift;
        self
    }

    /// The square's bounding box on frame `index`.
    pub(crate) fn region(&self, index: usize) -> Region {
        Region::from_corner(
            self.start_x + self.velocity_x * index as f64,
            self.start_y + self.velocity_y * index as f64,
            f64::from(SQUARE_SIZE),
            f64::from(SQUARE_SIZE),
        )
    }

    fn texture(&self, x: u32, y: u32, index: usize) -> u8 {
        let block = (y / BLOCK_SIZE) * BLOCKS + x / BLOCK_SIZE;
        let base = f64::from(self.blocks[block as usize]) + self.brightness_drift * index as f64;
        base.max(0.0).min(255.0) as u8
    }

    pub(crate) fn draw(&self, frame: &mut GrayFrame, index: usize) {
        let (x0, y0, _, _) = self.region(index).corner();
        let (x0, y0) = (x0.round() as i64, y0.round() as i64);
        for dy in 0..SQUARE_SIZE {
            for dx in 0..SQUARE_SIZE {
                let x = x0 + i64::from(dx);
                let y = y0 + i64::from(dy);
                if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
                    frame.put_pixel(x as u32, y as u32, Luma([self.texture(dx, dy, index)]));
                }
            }
        }
    }
}

pub(crate) fn blank() -> GrayFrame {
    GrayFrame::from_pixel(WIDTH, HEIGHT, Luma([BACKGROUND]))
}

/// A frame of uniform noise, with no structure anywhere.
pub(crate) fn noise(width: u32, height: u32, seed: u64) -> GrayFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    GrayFrame::from_fn(width, height, |_, _| Luma([(rng.next_u32() & 0xff) as u8]))
}

/// Render frame `index` with all of the given squares.
pub(crate) fn render(squares: &[MovingSquare], index: usize) -> GrayFrame {
    let mut frame = blank();
    for square in squares {
        square.draw(&mut frame, index);
    }
    frame
}

/// Replace everything inside `region` with uniform noise.
pub(crate) fn occlude(frame: &mut GrayFrame, region: &Region, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (x0, y0, width, height) = region.corner();
    let x_range = (x0.floor().max(0.0) as u32)..((x0 + width).ceil() as u32).min(frame.width());
    let y_range = (y0.floor().max(0.0) as u32)..((y0 + height).ceil() as u32).min(frame.height());
    for y in y_range {
        for x in x_range.clone() {
            frame.put_pixel(x, y, Luma([(rng.next_u32() & 0xff) as u8]));
        }
    }
}
