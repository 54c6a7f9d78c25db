//! Sliding windows over a sampled series.
//!
//! Windows are fixed-length slices advanced by `length - overlap` samples.
//! The position is an explicit [`Cursor`] value: every call takes the cursor
//! it should read from and hands back the cursor for the next call, so the
//! same position can be replayed against a parallel series (labels) without
//! advancing twice.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Start index of the next window to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor(usize);

impl Cursor {
    /// Cursor at the beginning of a series.
    pub const fn start() -> Self {
        Cursor(0)
    }

    pub const fn position(self) -> usize {
        self.0
    }
}

/// Half-open sample range `[start, end)` covered by a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub start: usize,
    pub end: usize,
}

impl WindowBounds {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Index of the last sample in the window.
    pub fn last(&self) -> usize {
        self.end.saturating_sub(1)
    }
}

/// Result of sliding over a series.
#[derive(Debug, PartialEq)]
pub enum Slide<'a, T> {
    /// A full window, and where the following window starts.
    Window {
        bounds: WindowBounds,
        samples: &'a [T],
        next: Cursor,
    },
    /// No further full window fits in the series.
    End,
}

/// Window length and step, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowSpec")]
pub struct WindowSpec {
    length: usize,
    overlap: usize,
}

/// Unchecked wire form of [`WindowSpec`].
#[derive(Deserialize)]
struct RawWindowSpec {
    length: usize,
    overlap: usize,
}

impl TryFrom<RawWindowSpec> for WindowSpec {
    type Error = PipelineError;

    fn try_from(raw: RawWindowSpec) -> Result<Self> {
        WindowSpec::new(raw.length, raw.overlap)
    }
}

impl WindowSpec {
    /// Create a window spec; `overlap` must be smaller than `length`.
    pub fn new(length: usize, overlap: usize) -> Result<Self> {
        if length == 0 || overlap >= length {
            return Err(PipelineError::InvalidWindow { length, overlap });
        }
        Ok(Self { length, overlap })
    }

    /// Window spec from durations at a given sampling rate.
    pub fn from_seconds(sample_rate_hz: u32, length_secs: u64, overlap_secs: u64) -> Result<Self> {
        let rate = sample_rate_hz as usize;
        Self::new(rate * length_secs as usize, rate * overlap_secs as usize)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Samples the cursor advances per window.
    pub fn step(&self) -> usize {
        self.length - self.overlap
    }

    /// Number of full windows that fit in a series of `len` samples.
    pub fn window_count(&self, len: usize) -> usize {
        if len < self.length {
            0
        } else {
            (len - self.length) / self.step() + 1
        }
    }

    /// Bounds of the window at `cursor`, if a full window fits.
    pub fn bounds_at(&self, len: usize, cursor: Cursor) -> Option<WindowBounds> {
        let start = cursor.position();
        let end = start.checked_add(self.length)?;
        if end > len {
            return None;
        }
        Some(WindowBounds { start, end })
    }

    /// Read the window at `cursor` and return the cursor for the next one.
    pub fn slide<'a, T>(&self, series: &'a [T], cursor: Cursor) -> Slide<'a, T> {
        match self.bounds_at(series.len(), cursor) {
            Some(bounds) => Slide::Window {
                bounds,
                samples: &series[bounds.start..bounds.end],
                next: Cursor(bounds.start + self.step()),
            },
            None => Slide::End,
        }
    }

    /// Read the window at `cursor` from a parallel series without advancing.
    pub fn peek<'a, T>(&self, series: &'a [T], cursor: Cursor) -> Option<&'a [T]> {
        self.bounds_at(series.len(), cursor)
            .map(|bounds| &series[bounds.start..bounds.end])
    }

    /// Iterate over every full window of a series.
    pub fn windows<'a, T>(&self, series: &'a [T]) -> Windows<'a, T> {
        Windows {
            spec: *self,
            series,
            cursor: Cursor::start(),
        }
    }
}

/// Iterator returned by [`WindowSpec::windows`].
pub struct Windows<'a, T> {
    spec: WindowSpec,
    series: &'a [T],
    cursor: Cursor,
}

impl<'a, T> Iterator for Windows<'a, T> {
    type Item = (WindowBounds, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        match self.spec.slide(self.series, self.cursor) {
            Slide::Window {
                bounds,
                samples,
                next,
            } => {
                self.cursor = next;
                Some((bounds, samples))
            }
            Slide::End => None,
        }
    }
}
