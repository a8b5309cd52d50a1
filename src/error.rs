// SPDX-License-Identifier: GPL-3.0-or-later
use std::error::Error as StdError;
use std::fmt;

use crate::geometry::Region;

/// The ways a tracking session can fail.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackerError {
    /// The seed region has a non-positive size or does not fit inside the frame.
    InvalidRegion {
        region: Region,
        frame_width: u32,
        frame_height: u32,
    },

    /// A frame given to `update` is not the same size as the one the session was started with.
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The confidence score dropped below the threshold.
    ///
    /// `region` is the last successfully tracked region. `psr` is only present for the frame that
    /// caused the loss; later calls on a lost session report `None`.
    TrackerLost { region: Region, psr: Option<f64> },

    /// `update` was called before `init`.
    NotInitialized,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegion {
                region,
                frame_width,
                frame_height,
            } => write!(
                f,
                "Region {} is not a valid region for a {}x{} frame",
                region, frame_width, frame_height
            ),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "Frame is {}x{}, but the tracker was initialized with a {}x{} frame",
                actual.0, actual.1, expected.0, expected.1
            ),
            Self::TrackerLost {
                region,
                psr: Some(psr),
            } => write!(f, "Lost track of object at {} (PSR {:.2})", region, psr),
            Self::TrackerLost { region, psr: None } => {
                write!(f, "Object was lost at {}, re-initialize the tracker", region)
            }
            Self::NotInitialized => f.write_str("Tracker has not been initialized"),
        }
    }
}

impl StdError for TrackerError {}

#[cfg(test)]
mod test {
    use super::TrackerError;
    use crate::geometry::Region;

    #[test]
    fn display_lost_with_psr() {
        let err = TrackerError::TrackerLost {
            region: Region::from_corner(1.0, 2.0, 3.0, 4.0),
            psr: Some(3.25),
        };
        let message = err.to_string();
        assert!(message.contains("PSR 3.25"), "{}", message);
    }

    #[test]
    fn into_anyhow() {
        // The binary relies on being able to bubble these up through anyhow.
        let err: anyhow::Error = TrackerError::NotInitialized.into();
        assert_eq!(err.to_string(), "Tracker has not been initialized");
    }
}
