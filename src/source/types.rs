//! Raw accelerometer sample types.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integer activity label attached to every raw sample.
pub type Label = u32;

/// The fixed accelerometer axes, in feature column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// A single tri-axial accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelSample {
    pub fn new(timestamp: DateTime<Utc>, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Value on the given axis.
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// A raw series with one activity label per sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSeries {
    pub samples: Vec<AccelSample>,
    pub labels: Vec<Label>,
}

impl RawSeries {
    /// Create a series, rejecting samples and labels of different lengths.
    pub fn new(samples: Vec<AccelSample>, labels: Vec<Label>) -> Result<Self> {
        if samples.len() != labels.len() {
            return Err(PipelineError::length_mismatch(samples.len(), labels.len()));
        }
        Ok(Self { samples, labels })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check the parallel-sequence invariant on a series built by hand.
    pub fn validate(&self) -> Result<()> {
        if self.samples.len() != self.labels.len() {
            return Err(PipelineError::length_mismatch(
                self.samples.len(),
                self.labels.len(),
            ));
        }
        Ok(())
    }
}
