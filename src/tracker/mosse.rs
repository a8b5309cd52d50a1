// SPDX-License-Identifier: GPL-3.0-or-later
use std::mem;

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use rustfft::num_complex::Complex64;
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::geometry::Region;
use crate::image_buffer::GrayFrame;

use super::correlate::{find_peak, Peak};
use super::filter::{desired_response, CorrelationFilter};
use super::patch::{extract, patch_center, Perturbation};
use super::preprocess::Preprocessor;
use super::settings::TrackerSettings;
use super::spectrum::Spectrum;
use super::{SessionState, Tracker};

/// Patches are never smaller than this along either side, so even tiny regions leave room for a
/// meaningful sidelobe around the response peak.
const MIN_PATCH_SIZE: u32 = 32;

/// The patch length needed to cover `extent` pixels of region plus its padding.
fn patch_length(extent: f64, padding: f64) -> u32 {
    let padded = (extent * padding.max(1.0)).round() as u32;
    padded.max(MIN_PATCH_SIZE)
}

/// Where the object was found on a frame, and how confident the tracker is about it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Localization {
    pub region: Region,

    /// How far the object moved from the previous region, as `(dx, dy)` in pixels. This is the
    /// raw response peak offset, before the new region is clamped to the frame.
    pub displacement: (f64, f64),

    /// The peak-to-sidelobe ratio of the correlation response.
    pub psr: f64,
}

/// Everything learned about the object during one session.
#[derive(Clone, Debug)]
struct Model {
    filter: CorrelationFilter,
    preprocessor: Preprocessor,
    spectrum: Spectrum,
    region: Region,
    /// `(width, height)` of the frame the session was started on.
    frame_size: (u32, u32),
    /// `(width, height)` of every patch, the region plus the context around it. Fixed for the
    /// life of the session.
    patch_size: (u32, u32),
}

impl Model {
    fn train(frame: &GrayFrame, region: Region, settings: &TrackerSettings) -> Self {
        let patch_size = (
            patch_length(region.width, settings.padding),
            patch_length(region.height, settings.padding),
        );
        let (patch_width, patch_height) = patch_size;
        let (rows, columns) = (patch_height as usize, patch_width as usize);
        let preprocessor = Preprocessor::new(columns, rows);
        let spectrum = Spectrum::new(rows, columns);
        let (peak_x, peak_y) = patch_center(patch_width, patch_height);
        let target = spectrum.forward(&desired_response(
            rows,
            columns,
            (peak_y as usize, peak_x as usize),
            settings.sigma,
        ));
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let object_size = region.width.min(region.height) as f32;
        let sample_count = settings.training_samples.get();
        // The first sample is always the seed patch as-is.
        let samples = (0..sample_count).map(|index| {
            let perturbation = if index == 0 {
                Perturbation::IDENTITY
            } else {
                Perturbation::random(&mut rng, &settings.perturbation, object_size)
            };
            let patch = extract(
                frame,
                region.center,
                patch_width,
                patch_height,
                &perturbation,
            );
            spectrum.forward(&preprocessor.process(&patch))
        });
        let filter = CorrelationFilter::train(target, samples, settings.regularization);
        debug_assert_eq!(preprocessor.dim(), spectrum.dim());
        debug_assert_eq!(filter.dim(), spectrum.dim());
        debug!(
            samples = sample_count,
            rows,
            columns,
            area = region.area(),
            "Trained correlation filter"
        );
        Self {
            filter,
            preprocessor,
            spectrum,
            region,
            frame_size: frame.dimensions(),
            patch_size,
        }
    }

    /// The preprocessed transform of the (unwarped) patch centered on `region`.
    fn sample(&self, frame: &GrayFrame, region: &Region) -> Array2<Complex64> {
        let (width, height) = self.patch_size;
        let patch = extract(frame, region.center, width, height, &Perturbation::IDENTITY);
        self.spectrum.forward(&self.preprocessor.process(&patch))
    }

    /// Correlate the filter with the patch at the current region.
    ///
    /// Returns the response peak and its offset from the patch center as `(dx, dy)`.
    fn locate(&self, frame: &GrayFrame, exclusion: usize) -> (Peak, (f64, f64)) {
        let sample = self.sample(frame, &self.region);
        let response = self
            .spectrum
            .inverse(self.filter.apply(&sample))
            .mapv(|value| value.re);
        let peak = find_peak(&response, exclusion);
        let (center_x, center_y) = patch_center(self.patch_size.0, self.patch_size.1);
        let (peak_row, peak_column) = peak.position;
        let displacement = (
            peak_column as f64 - f64::from(center_x),
            peak_row as f64 - f64::from(center_y),
        );
        (peak, displacement)
    }
}

#[derive(Clone, Debug)]
enum Session {
    Uninitialized,
    Tracking(Model),
    /// The model is kept only to report the last known region.
    Lost(Model),
}

/// A single-object tracker using a MOSSE (Minimum Output Sum of Squared Error) correlation
/// filter.
///
/// Each instance tracks one object. Instances share nothing, so independent objects can be
/// tracked (even on separate threads) by creating one tracker per object.
#[derive(Clone, Debug)]
pub struct MosseTracker {
    settings: TrackerSettings,
    session: Session,
}

impl MosseTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            session: Session::Uninitialized,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// The most recent region the object was successfully tracked to, if there is one.
    ///
    /// This is still available after the object has been lost.
    pub fn region(&self) -> Option<Region> {
        match &self.session {
            Session::Uninitialized => None,
            Session::Tracking(model) | Session::Lost(model) => Some(model.region),
        }
    }

    /// Locate the object on the next frame, then adapt the filter to its new appearance.
    ///
    /// This is the same as [`Tracker::update`], but with the confidence score and the raw
    /// displacement included. Failed calls never change the filter.
    pub fn track(&mut self, frame: &GrayFrame) -> Result<Localization, TrackerError> {
        let model = match &mut self.session {
            Session::Uninitialized => return Err(TrackerError::NotInitialized),
            Session::Lost(model) => {
                return Err(TrackerError::TrackerLost {
                    region: model.region,
                    psr: None,
                })
            }
            Session::Tracking(model) => model,
        };
        let frame_size = frame.dimensions();
        if frame_size != model.frame_size {
            return Err(TrackerError::DimensionMismatch {
                expected: model.frame_size,
                actual: frame_size,
            });
        }
        let (peak, displacement) = model.locate(frame, self.settings.sidelobe_exclusion);
        // NaN fails this comparison too.
        if !(peak.psr >= self.settings.psr_threshold) {
            let region = model.region;
            warn!(
                %region,
                psr = peak.psr,
                threshold = self.settings.psr_threshold,
                "Lost track of object"
            );
            self.session = match mem::replace(&mut self.session, Session::Uninitialized) {
                Session::Tracking(model) => Session::Lost(model),
                other => other,
            };
            return Err(TrackerError::TrackerLost {
                region,
                psr: Some(peak.psr),
            });
        }
        let (frame_width, frame_height) = model.frame_size;
        let region = model
            .region
            .translated(displacement.0, displacement.1)
            .clamped(frame_width, frame_height);
        let sample = model.sample(frame, &region);
        model.filter.blend(&sample, self.settings.learning_rate);
        model.region = region;
        debug!(
            %region,
            dx = displacement.0,
            dy = displacement.1,
            psr = peak.psr,
            peak = peak.value,
            "Located object"
        );
        Ok(Localization {
            region,
            displacement,
            psr: peak.psr,
        })
    }

    #[cfg(test)]
    fn filter_dim(&self) -> Option<(usize, usize)> {
        match &self.session {
            Session::Uninitialized => None,
            Session::Tracking(model) | Session::Lost(model) => Some(model.filter.dim()),
        }
    }

    #[cfg(test)]
    fn kernel(&self) -> Option<Array2<Complex64>> {
        match &self.session {
            Session::Uninitialized => None,
            Session::Tracking(model) | Session::Lost(model) => Some(model.filter.kernel().clone()),
        }
    }
}

impl Default for MosseTracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

impl Tracker for MosseTracker {
    /// Train a new filter on `region`, discarding any previous session.
    ///
    /// If the region is rejected, the previous session (if any) is left as it was.
    fn init(&mut self, frame: &GrayFrame, region: Region) -> Result<(), TrackerError> {
        let (frame_width, frame_height) = frame.dimensions();
        if !region.fits_within(frame_width, frame_height) {
            return Err(TrackerError::InvalidRegion {
                region,
                frame_width,
                frame_height,
            });
        }
        if self.state() != SessionState::Uninitialized {
            debug!(previous = %self.state(), "Discarding previous tracking session");
        }
        self.session = Session::Tracking(Model::train(frame, region, &self.settings));
        info!(%region, frame_width, frame_height, "Started tracking");
        Ok(())
    }

    fn update(&mut self, frame: &GrayFrame) -> Result<Region, TrackerError> {
        self.track(frame).map(|localization| localization.region)
    }

    fn state(&self) -> SessionState {
        match self.session {
            Session::Uninitialized => SessionState::Uninitialized,
            Session::Tracking(_) => SessionState::Tracking,
            Session::Lost(_) => SessionState::Lost,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::TrackerError;
    use crate::geometry::Region;
    use crate::image_buffer::GrayFrame;
    use crate::tracker::scene::{self, MovingSquare};
    use crate::tracker::{SessionState, Tracker, TrackerSettings};

    use super::{patch_length, MosseTracker, MIN_PATCH_SIZE};

    /// How far (in pixels) a tracked center may be from the true center.
    const TOLERANCE: f64 = 2.0;

    fn assert_near(tracked: &Region, truth: &Region, index: usize) {
        let distance = tracked.center.distance(truth.center);
        assert!(
            distance <= TOLERANCE,
            "Frame {}: tracked {} but the object is at {} ({:.2}px away)",
            index,
            tracked,
            truth,
            distance
        );
    }

    #[test]
    fn send() {
        fn assert_send<T: Send>() {}
        assert_send::<MosseTracker>();
    }

    #[test]
    fn same_frame() -> anyhow::Result<()> {
        let square = MovingSquare::new(40.0, 30.0, 0.0, 0.0);
        let frame = scene::render(&[square.clone()], 0);
        let mut tracker = MosseTracker::default();
        tracker.init(&frame, square.region(0))?;
        assert_eq!(tracker.state(), SessionState::Tracking);
        let located = tracker.track(&frame)?;
        assert!(located.displacement.0.abs() <= 1.0, "{:?}", located);
        assert!(located.displacement.1.abs() <= 1.0, "{:?}", located);
        assert!(
            located.psr > 1.5 * tracker.settings().psr_threshold,
            "PSR was only {}",
            located.psr
        );
        assert_near(&located.region, &square.region(0), 1);
        Ok(())
    }

    #[test]
    fn same_frame_any_size() -> anyhow::Result<()> {
        // Noise is the hardest texture to train on: every warp decorrelates it.
        let frame = scene::noise(64, 48, 11);
        for size in [3.0, 5.0, 8.0, 12.0, 16.0, 24.0].iter() {
            let region = Region::new(32.0, 24.0, *size, *size);
            let mut tracker = MosseTracker::default();
            tracker.init(&frame, region)?;
            let located = tracker.track(&frame)?;
            assert_eq!(located.displacement, (0.0, 0.0), "Size {}", size);
            assert!(
                located.psr > 1.5 * tracker.settings().psr_threshold,
                "Size {}: PSR was only {}",
                size,
                located.psr
            );
        }
        Ok(())
    }

    #[test]
    fn same_frame_uniform_square() -> anyhow::Result<()> {
        let square = MovingSquare::new(20.0, 30.0, 0.0, 0.0).uniform(220);
        let frame = scene::render(&[square.clone()], 0);
        let mut tracker = MosseTracker::default();
        tracker.init(&frame, square.region(0))?;
        let located = tracker.track(&frame)?;
        assert!(
            located.psr > 1.5 * tracker.settings().psr_threshold,
            "PSR was only {}",
            located.psr
        );
        assert_near(&located.region, &square.region(0), 0);
        Ok(())
    }

    #[test]
    fn follows_uniform_square() -> anyhow::Result<()> {
        let square = MovingSquare::new(20.0, 30.0, 2.0, 1.0)
            .uniform(220)
            .with_drift(0.5);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        for index in 1..=50 {
            let located = tracker.track(&scene::render(&[square.clone()], index))?;
            assert_near(&located.region, &square.region(index), index);
        }
        Ok(())
    }

    #[test]
    fn seed_on_frame_edge() -> anyhow::Result<()> {
        let corner = MovingSquare::new(0.0, 0.0, 0.0, 0.0).with_pattern(4);
        let frame = scene::render(&[corner.clone()], 0);
        let mut tracker = MosseTracker::default();
        tracker.init(&frame, corner.region(0))?;
        let located = tracker.track(&frame)?;
        assert_near(&located.region, &corner.region(0), 0);

        let edge = MovingSquare::new(0.0, 40.0, 0.0, 1.0).with_pattern(5);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[edge.clone()], 0), edge.region(0))?;
        for index in 1..=20 {
            let region = tracker.update(&scene::render(&[edge.clone()], index))?;
            assert_near(&region, &edge.region(index), index);
        }
        Ok(())
    }

    #[test]
    fn sub_pixel_seed() -> anyhow::Result<()> {
        let square = MovingSquare::new(40.0, 30.0, 1.0, 1.0);
        let seed = Region::from_corner(40.4, 29.6, 23.5, 24.4);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), seed)?;
        assert_eq!(tracker.filter_dim(), Some((49, 47)));
        for index in 1..=10 {
            let region = tracker.update(&scene::render(&[square.clone()], index))?;
            assert_near(&region, &square.region(index), index);
            assert_eq!((region.width, region.height), (seed.width, seed.height));
        }
        Ok(())
    }

    #[test]
    fn follows_moving_square() -> anyhow::Result<()> {
        let square = MovingSquare::new(10.0, 20.0, 2.0, 1.0).with_drift(0.5);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        for index in 1..=50 {
            let frame = scene::render(&[square.clone()], index);
            let region = tracker.update(&frame)?;
            assert_near(&region, &square.region(index), index);
        }
        Ok(())
    }

    #[test]
    fn filter_size_is_fixed() -> anyhow::Result<()> {
        let square = MovingSquare::new(30.0, 30.0, 1.0, -1.0);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        let side = (f64::from(scene::SQUARE_SIZE) * tracker.settings().padding).round() as usize;
        let expected = (side, side);
        assert_eq!(tracker.filter_dim(), Some(expected));
        for index in 1..=10 {
            tracker.update(&scene::render(&[square.clone()], index))?;
            assert_eq!(tracker.filter_dim(), Some(expected));
        }
        Ok(())
    }

    #[test]
    fn patch_sizes() {
        assert_eq!(patch_length(24.0, 2.0), 48);
        assert_eq!(patch_length(23.6, 2.0), 47);
        // Tiny regions still get a usable patch.
        assert_eq!(patch_length(3.0, 2.0), MIN_PATCH_SIZE);
        // Padding never shrinks the patch below the region.
        assert_eq!(patch_length(40.0, 0.5), 40);
        assert_eq!(patch_length(40.0, f64::NAN), 40);
    }

    #[test]
    fn occlusion_is_lost() -> anyhow::Result<()> {
        let square = MovingSquare::new(60.0, 40.0, 0.0, 0.0);
        let first = scene::render(&[square.clone()], 0);
        let mut tracker = MosseTracker::default();
        tracker.init(&first, square.region(0))?;
        let last = tracker.update(&scene::render(&[square.clone()], 1))?;

        let mut occluded = scene::render(&[square.clone()], 2);
        scene::occlude(&mut occluded, &square.region(2), 99);
        match tracker.update(&occluded) {
            Err(TrackerError::TrackerLost {
                region,
                psr: Some(psr),
            }) => {
                assert_eq!(region, last);
                assert!(psr < tracker.settings().psr_threshold);
            }
            other => panic!("Expected the object to be lost, got {:?}", other),
        }
        assert_eq!(tracker.state(), SessionState::Lost);
        assert_eq!(tracker.region(), Some(last));

        // Even a clean frame doesn't bring it back.
        assert_eq!(
            tracker.update(&first),
            Err(TrackerError::TrackerLost {
                region: last,
                psr: None
            })
        );
        assert_eq!(tracker.state(), SessionState::Lost);
        Ok(())
    }

    #[test]
    fn failed_updates_keep_kernel() -> anyhow::Result<()> {
        let square = MovingSquare::new(60.0, 40.0, 0.0, 0.0);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        tracker.update(&scene::render(&[square.clone()], 1))?;
        let trained = tracker.kernel();
        assert!(trained.is_some());

        assert!(tracker.update(&GrayFrame::new(80, 60)).is_err());
        assert_eq!(tracker.kernel(), trained);

        let mut occluded = scene::render(&[square.clone()], 2);
        scene::occlude(&mut occluded, &square.region(2), 99);
        assert!(matches!(
            tracker.update(&occluded),
            Err(TrackerError::TrackerLost { psr: Some(_), .. })
        ));
        assert_eq!(tracker.kernel(), trained);

        assert!(tracker
            .update(&scene::render(&[square.clone()], 3))
            .is_err());
        assert_eq!(tracker.kernel(), trained);
        Ok(())
    }

    #[test]
    fn update_before_init() {
        let mut tracker = MosseTracker::default();
        assert_eq!(
            tracker.update(&scene::blank()),
            Err(TrackerError::NotInitialized)
        );
        assert_eq!(tracker.state(), SessionState::Uninitialized);
        assert_eq!(tracker.region(), None);
    }

    #[test]
    fn invalid_regions() -> anyhow::Result<()> {
        let square = MovingSquare::new(50.0, 50.0, 1.0, 0.0);
        let frame = scene::render(&[square.clone()], 0);
        let mut tracker = MosseTracker::default();
        tracker.init(&frame, square.region(0))?;
        let invalid = [
            Region::new(60.0, 60.0, 0.0, 10.0),
            Region::new(60.0, 60.0, 10.0, -4.0),
            Region::from_corner(150.0, 100.0, 24.0, 24.0),
            Region::from_corner(-1.0, 0.0, 10.0, 10.0),
        ];
        for region in invalid.iter() {
            assert_eq!(
                tracker.init(&frame, *region),
                Err(TrackerError::InvalidRegion {
                    region: *region,
                    frame_width: scene::WIDTH,
                    frame_height: scene::HEIGHT,
                })
            );
            assert_eq!(tracker.state(), SessionState::Tracking);
            assert_eq!(tracker.region(), Some(square.region(0)));
        }
        assert!(matches!(
            tracker.init(&frame, Region::new(f64::NAN, 60.0, 10.0, 10.0)),
            Err(TrackerError::InvalidRegion { .. })
        ));
        assert_eq!(tracker.region(), Some(square.region(0)));
        // The original session still works.
        let region = tracker.update(&scene::render(&[square.clone()], 1))?;
        assert_near(&region, &square.region(1), 1);

        let mut fresh = MosseTracker::default();
        assert!(fresh.init(&frame, invalid[0]).is_err());
        assert_eq!(fresh.state(), SessionState::Uninitialized);
        Ok(())
    }

    #[test]
    fn dimension_mismatch() -> anyhow::Result<()> {
        let square = MovingSquare::new(50.0, 50.0, 0.0, 1.0);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        assert_eq!(
            tracker.update(&GrayFrame::new(80, 60)),
            Err(TrackerError::DimensionMismatch {
                expected: (scene::WIDTH, scene::HEIGHT),
                actual: (80, 60),
            })
        );
        assert_eq!(tracker.state(), SessionState::Tracking);
        let region = tracker.update(&scene::render(&[square.clone()], 1))?;
        assert_near(&region, &square.region(1), 1);
        Ok(())
    }

    #[test]
    fn reinit_after_loss() -> anyhow::Result<()> {
        let square = MovingSquare::new(60.0, 40.0, 0.0, 0.0);
        let mut tracker = MosseTracker::default();
        tracker.init(&scene::render(&[square.clone()], 0), square.region(0))?;
        let mut occluded = scene::render(&[square.clone()], 1);
        scene::occlude(&mut occluded, &square.region(1), 7);
        assert!(tracker.update(&occluded).is_err());
        assert_eq!(tracker.state(), SessionState::Lost);

        let other = MovingSquare::new(100.0, 70.0, -1.0, -1.0).with_pattern(3);
        tracker.init(&scene::render(&[other.clone()], 0), other.region(0))?;
        assert_eq!(tracker.state(), SessionState::Tracking);
        for index in 1..=5 {
            let region = tracker.update(&scene::render(&[other.clone()], index))?;
            assert_near(&region, &other.region(index), index);
        }
        Ok(())
    }

    #[test]
    fn independent_instances() -> anyhow::Result<()> {
        let right = MovingSquare::new(10.0, 10.0, 2.0, 0.0).with_pattern(1);
        let up = MovingSquare::new(110.0, 80.0, 0.0, -1.0).with_pattern(2);
        let squares = [right.clone(), up.clone()];
        let first = scene::render(&squares, 0);

        let mut right_tracker = MosseTracker::default();
        let mut up_tracker = MosseTracker::default();
        right_tracker.init(&first, right.region(0))?;
        up_tracker.init(&first, up.region(0))?;
        let mut alone = MosseTracker::default();
        alone.init(&first, right.region(0))?;

        for index in 1..=30 {
            let frame = scene::render(&squares, index);
            let right_region = right_tracker.update(&frame)?;
            let up_region = up_tracker.update(&frame)?;
            assert_near(&right_region, &right.region(index), index);
            assert_near(&up_region, &up.region(index), index);
            // Running another tracker alongside changes nothing.
            assert_eq!(alone.update(&frame)?, right_region);
        }
        Ok(())
    }
}
