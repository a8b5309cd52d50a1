// SPDX-License-Identifier: GPL-3.0-or-later
use image::Luma;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};

use crate::geometry::Point;
use crate::image_buffer::GrayFrame;

use super::settings::PerturbationBounds;

/// Scale jitter is capped here so a warp can never flip or collapse the patch.
const MAX_SCALE_JITTER: f32 = 0.5;

/// A small affine warp of a patch about its center.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Perturbation {
    rotation: f32,
    scale: f32,
    shift_x: f32,
    shift_y: f32,
}

impl Perturbation {
    pub(crate) const IDENTITY: Self = Self {
        rotation: 0.0,
        scale: 1.0,
        shift_x: 0.0,
        shift_y: 0.0,
    };

    /// Draw a random warp, uniformly within the given bounds.
    ///
    /// Translation bounds are a fraction of `object_size`, the shorter side of the tracked region.
    pub(crate) fn random<R: RngCore>(
        rng: &mut R,
        bounds: &PerturbationBounds,
        object_size: f32,
    ) -> Self {
        fn symmetric<R: RngCore>(rng: &mut R, limit: f32) -> f32 {
            if limit.is_finite() && limit > 0.0 {
                Uniform::new_inclusive(-limit, limit).sample(rng)
            } else {
                0.0
            }
        }
        let translation = bounds.translation * object_size;
        Self {
            rotation: symmetric(rng, bounds.rotation),
            scale: 1.0 + symmetric(rng, bounds.scale.min(MAX_SCALE_JITTER)),
            shift_x: symmetric(rng, translation),
            shift_y: symmetric(rng, translation),
        }
    }

    /// The warp as a projection in patch coordinates, rotating and scaling about `pivot`.
    fn projection(&self, pivot_x: f32, pivot_y: f32) -> Projection {
        Projection::translate(pivot_x + self.shift_x, pivot_y + self.shift_y)
            * Projection::rotate(self.rotation)
            * Projection::scale(self.scale, self.scale)
            * Projection::translate(-pivot_x, -pivot_y)
    }

    /// How far outside of a `width` x `height` patch this warp (plus bilinear sampling) can reach.
    fn reach(&self, width: u32, height: u32) -> u32 {
        let radius = f64::from(width).hypot(f64::from(height)) / 2.0;
        let scale = f64::from(self.scale);
        let spread = (f64::from(self.rotation).abs() + (1.0 - scale).abs()) / scale;
        let shift = f64::from(self.shift_x)
            .abs()
            .max(f64::from(self.shift_y).abs());
        (radius * spread + shift / scale + 1.0).ceil() as u32 + 1
    }
}

/// The patch-space pixel that lines up with the tracked center.
///
/// Using integer halves keeps the desired response peak, the crop, and the displacement math
/// referring to the same pixel.
pub(crate) fn patch_center(width: u32, height: u32) -> (u32, u32) {
    (width / 2, height / 2)
}

/// Copy the `width` x `height` block of `frame` starting at (`left`, `top`). Anything past the
/// frame's border repeats the nearest edge pixel.
fn clamped_crop(frame: &GrayFrame, left: i64, top: i64, width: u32, height: u32) -> GrayFrame {
    let last_x = i64::from(frame.width()) - 1;
    let last_y = i64::from(frame.height()) - 1;
    GrayFrame::from_fn(width, height, |x, y| {
        let source_x = (left + i64::from(x)).min(last_x).max(0);
        let source_y = (top + i64::from(y)).min(last_y).max(0);
        *frame.get_pixel(source_x as u32, source_y as u32)
    })
}

/// Cut a `width` x `height` patch out of `frame`, centered on `center`, and warp it.
///
/// Sampling is bilinear so sub-pixel centers are handled. Parts of the patch beyond the frame
/// repeat the frame's edge pixels.
pub(crate) fn extract(
    frame: &GrayFrame,
    center: Point<f64>,
    width: u32,
    height: u32,
    perturbation: &Perturbation,
) -> GrayFrame {
    let mut patch = GrayFrame::new(width, height);
    if frame.width() == 0 || frame.height() == 0 {
        return patch;
    }
    let (pivot_x, pivot_y) = patch_center(width, height);
    let origin_x = center.x - f64::from(pivot_x);
    let origin_y = center.y - f64::from(pivot_y);
    let margin = perturbation.reach(width, height);
    let left = origin_x.floor() as i64 - i64::from(margin);
    let top = origin_y.floor() as i64 - i64::from(margin);
    let context = clamped_crop(
        frame,
        left,
        top,
        width + 2 * margin + 1,
        height + 2 * margin + 1,
    );
    // Projections map context coordinates to patch coordinates: crop first, then warp.
    let crop = Projection::translate(
        -(origin_x - left as f64) as f32,
        -(origin_y - top as f64) as f32,
    );
    let projection = perturbation.projection(pivot_x as f32, pivot_y as f32) * crop;
    warp_into(
        &context,
        &projection,
        Interpolation::Bilinear,
        Luma([0u8]),
        &mut patch,
    );
    patch
}
