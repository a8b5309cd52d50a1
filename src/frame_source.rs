// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{debug, trace};

use mosse_tracker::{grayscale, GrayFrame};

/// Something that produces a sequence of grayscale frames.
pub(crate) trait FrameSource {
    /// The next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> anyhow::Result<Option<GrayFrame>>;
}

/// In-memory frames are played back in order.
impl FrameSource for VecDeque<GrayFrame> {
    fn next_frame(&mut self) -> anyhow::Result<Option<GrayFrame>> {
        Ok(self.pop_front())
    }
}

/// Frames read from image files in a directory, in file name order.
#[derive(Clone, Debug)]
pub(crate) struct ImageSequence {
    paths: VecDeque<PathBuf>,
}

impl ImageSequence {
    /// Find every file in `directory` with one of the given extensions.
    ///
    /// Subdirectories are not searched.
    pub(crate) fn open<S: AsRef<str>>(directory: &Path, extensions: &[S]) -> anyhow::Result<Self> {
        let entries = fs::read_dir(directory)
            .with_context(|| format!("Unable to list frames in {}", directory.display()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Unable to list frames in {}", directory.display()))?
                .path();
            let matches = path
                .extension()
                .and_then(|extension| extension.to_str())
                .map_or(false, |extension| {
                    extensions
                        .iter()
                        .any(|wanted| wanted.as_ref().eq_ignore_ascii_case(extension))
                });
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(
            count = paths.len(),
            directory = %directory.display(),
            "Found frames"
        );
        Ok(Self {
            paths: paths.into(),
        })
    }

    /// The number of frames left.
    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> anyhow::Result<Option<GrayFrame>> {
        let path = match self.paths.pop_front() {
            Some(path) => path,
            None => return Ok(None),
        };
        trace!(path = %path.display(), "Loading frame");
        let image = image::open(&path)
            .with_context(|| format!("Unable to load frame {}", path.display()))?;
        Ok(Some(grayscale(&image).into_owned()))
    }
}
