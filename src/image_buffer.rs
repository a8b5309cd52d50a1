// SPDX-License-Identifier: GPL-3.0-or-later
use std::borrow::Cow;

use image::{DynamicImage, ImageBuffer, Luma};

/// Frames (and patches cut from them) as the tracker sees them: 8-bit luma.
pub type GrayFrame = ImageBuffer<Luma<u8>, Vec<u8>>;

/// Convert a decoded frame to grayscale, borrowing it if it already is 8-bit luma.
pub fn grayscale(frame: &DynamicImage) -> Cow<'_, GrayFrame> {
    match frame {
        DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
        other => Cow::Owned(other.to_luma8()),
    }
}
