//! Trim/rotate requests for verification videos.

use crate::error::{ConsoleError, Result};

/// Granularity of trim points, in seconds.
pub const TRIM_STEP_SECS: f64 = 0.05;

/// Clockwise rotation applied to the video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    /// Unchanged
    #[default]
    None,
    /// 90 degrees
    Quarter,
    /// 180 degrees
    Half,
    /// 270 degrees
    ThreeQuarters,
}

impl Rotation {
    /// Rotation in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarters => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ConsoleError;

    fn try_from(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::ThreeQuarters),
            other => Err(ConsoleError::InvalidRotation(other)),
        }
    }
}

/// A validated edit request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoEdit {
    start_secs: f64,
    end_secs: f64,
    rotation: Rotation,
}

impl VideoEdit {
    /// Build an edit. Trim points are snapped to [`TRIM_STEP_SECS`] and must
    /// satisfy `0 <= start < end` after snapping.
    pub fn new(start_secs: f64, end_secs: f64, rotation_degrees: u16) -> Result<Self> {
        let rotation = Rotation::try_from(rotation_degrees)?;
        let start = snap(start_secs);
        let end = snap(end_secs);

        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(ConsoleError::InvalidTrimRange { start, end });
        }

        Ok(Self {
            start_secs: start,
            end_secs: end,
            rotation,
        })
    }

    /// Snapped start, in seconds.
    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    /// Snapped end, in seconds.
    pub fn end_secs(&self) -> f64 {
        self.end_secs
    }

    /// Rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Start as sent on the wire.
    pub fn start_millis(&self) -> u64 {
        (self.start_secs * 1000.0).round() as u64
    }

    /// End as sent on the wire.
    pub fn end_millis(&self) -> u64 {
        (self.end_secs * 1000.0).round() as u64
    }
}

fn snap(secs: f64) -> f64 {
    (secs / TRIM_STEP_SECS).round() * TRIM_STEP_SECS
}
