//! Core functionality of the activity pipeline.
//!
//! This module contains:
//! - Window bookkeeping over a sample series
//! - Per-axis feature functions
//! - The extraction loop producing a labelled feature table
//! - Importance-based feature selection

pub mod extraction;
pub mod features;
pub mod selection;
pub mod windowing;

// Re-export commonly used types
pub use extraction::{extract_feature_table, majority_label, FeatureRow, FeatureTable};
pub use features::{feature_names, FeatureExtractor, FeatureFunction, DEFAULT_FEATURES};
pub use selection::{FeatureSelector, SelectedFeatures, SelectionStrategy};
pub use windowing::{Cursor, Slide, WindowBounds, WindowSpec};
