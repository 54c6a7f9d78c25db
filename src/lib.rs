//! Accel Activity - activity recognition from tri-axial accelerometer data.
//!
//! This library turns a labelled accelerometer recording into a windowed
//! feature table, trains a random forest to recognise activities, and derives
//! hourly and daily behavioural summaries from the labelled windows.
//!
//! # Pipeline
//!
//! - **Windowing**: fixed-length windows slide over the series with a configurable overlap
//! - **Features**: nine statistical and spectral functions per axis by default
//! - **Selection**: an extra-trees ranking keeps the most predictive columns
//! - **Search**: stratified hold-out split, then a cross-validated grid search
//! - **Metrics**: per-hour and per-day summaries in the configured time zone
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Accel Activity                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│  Windowing  │──▶│  Features   │       │
//! │  │ (csv/synth) │   │ (10s / 1s)  │   │ (per axis)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                              │              │
//! │                                              ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Metrics    │◀──│ Grid search │◀──│  Selection  │       │
//! │  │(hourly/day) │   │  (forest)   │   │ (importance)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                                 │
//! │         ▼                 ▼                                 │
//! │  ┌─────────────────────────────┐                           │
//! │  │         Run report          │                           │
//! │  └─────────────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use accel_activity::{Config, Pipeline, SyntheticSource};
//!
//! let series = SyntheticSource::with_minutes(50, 30).generate()?;
//! let output = Pipeline::new(Config::default()).run(&series)?;
//!
//! println!("{}", output.report.summary());
//! println!("{}", output.hourly);
//! # Ok::<(), accel_activity::PipelineError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, SearchConfig, SelectionConfig};
pub use crate::core::{
    extract_feature_table, FeatureFunction, FeatureSelector, FeatureTable, SelectionStrategy,
    WindowSpec,
};
pub use error::{PipelineError, Result};
pub use metrics::{ActivityMetrics, Granularity, MetricKind, MetricsConfig, SummaryTable};
pub use model::{Forest, GridSearch, ParamGrid, StratifiedKFold};
pub use pipeline::{Pipeline, PipelineOutput};
pub use report::RunReport;
pub use source::{CsvSource, DataSource, RawSeries, SyntheticSource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
