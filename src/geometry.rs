// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context as _};
use image::Luma;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use num_traits::Num;

use crate::image_buffer::GrayFrame;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point<T: Num> {
    pub x: T,
    pub y: T,
}

impl<T: Num> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl Point<f64> {
    pub fn distance(&self, other: Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An axis-aligned box in pixel coordinates, stored by its center.
///
/// The origin is the top-left corner of the frame. Coordinates may be fractional.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    pub center: Point<f64>,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            center: Point::new(center_x, center_y),
            width,
            height,
        }
    }

    /// Create a region from the top-left corner and a size, the form most callers (and selection
    /// tools) use.
    pub fn from_corner(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x + width / 2.0, y + height / 2.0, width, height)
    }

    /// The `(x, y, width, height)` form of this region, with `(x, y)` the top-left corner.
    pub fn corner(&self) -> (f64, f64, f64, f64) {
        (
            self.center.x - self.width / 2.0,
            self.center.y - self.height / 2.0,
            self.width,
            self.height,
        )
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether this region has a positive size and lies entirely within a frame of the given
    /// dimensions.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        let (x, y, width, height) = self.corner();
        let finite = [x, y, width, height].iter().all(|v| v.is_finite());
        finite
            && width > 0.0
            && height > 0.0
            && x >= 0.0
            && y >= 0.0
            && x + width <= frame_width as f64
            && y + height <= frame_height as f64
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.center.x + dx, self.center.y + dy, self.width, self.height)
    }

    /// Move the center so the entire region is inside the frame.
    ///
    /// The size is never changed. If the region is larger than the frame along an axis, it is
    /// centered on the frame along that axis.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Self {
        fn clamp_axis(center: f64, size: f64, limit: f64) -> f64 {
            let low = size / 2.0;
            let high = limit - size / 2.0;
            if low > high {
                limit / 2.0
            } else {
                center.max(low).min(high)
            }
        }
        Self::new(
            clamp_axis(self.center.x, self.width, frame_width as f64),
            clamp_axis(self.center.y, self.height, frame_height as f64),
            self.width,
            self.height,
        )
    }

    /// Render a binary mask of this region: 255 inside, 0 outside.
    pub fn mask(&self, frame_width: u32, frame_height: u32) -> GrayFrame {
        let mut mask = GrayFrame::new(frame_width, frame_height);
        let (x, y, width, height) = self.corner();
        let width = width.round();
        let height = height.round();
        if width >= 1.0 && height >= 1.0 {
            let rect = Rect::at(x.round() as i32, y.round() as i32)
                .of_size(width as u32, height as u32);
            draw_filled_rect_mut(&mut mask, rect, Luma([u8::MAX]));
        }
        mask
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, width, height) = self.corner();
        write!(f, "({:.1}, {:.1}, {:.1}x{:.1})", x, y, width, height)
    }
}

/// Parses the `x,y,width,height` form.
impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid region component '{}'", part))
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;
        match values.as_slice() {
            [x, y, width, height] => Ok(Self::from_corner(*x, *y, *width, *height)),
            _ => Err(anyhow!(
                "A region needs exactly four values (x,y,width,height), got {}",
                values.len()
            )),
        }
    }
}
