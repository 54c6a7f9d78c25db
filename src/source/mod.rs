//! Raw data sources for the activity pipeline.
//!
//! A source hands over a complete labelled recording; the on-disk format is
//! owned by the source implementation.

pub mod csv_loader;
pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use csv_loader::CsvSource;
pub use synthetic::SyntheticSource;
pub use types::{AccelSample, Axis, Label, RawSeries};

use crate::error::Result;

/// Anything that can produce a labelled accelerometer recording.
pub trait DataSource {
    fn load(&mut self) -> Result<RawSeries>;
}
