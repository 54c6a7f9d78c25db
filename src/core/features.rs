//! Per-window statistical and spectral features.
//!
//! Every [`FeatureFunction`] maps one axis of a window to a single scalar.
//! The extractor applies each configured function to X, Y and Z in turn, so a
//! window yields `functions.len() * 3` values in function-major order.

use crate::source::types::{AccelSample, Axis};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// A scalar statistic computed over one axis of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFunction {
    MeanCrossings,
    SpectralEntropy,
    ZeroCrossings,
    InterquartileRange,
    Skewness,
    SpectralEnergy,
    Percentile25,
    Percentile75,
    Kurtosis,
    Mean,
    StandardDeviation,
    Minimum,
    Maximum,
}

/// The feature set used when none is configured.
pub const DEFAULT_FEATURES: [FeatureFunction; 9] = [
    FeatureFunction::MeanCrossings,
    FeatureFunction::SpectralEntropy,
    FeatureFunction::ZeroCrossings,
    FeatureFunction::InterquartileRange,
    FeatureFunction::Skewness,
    FeatureFunction::SpectralEnergy,
    FeatureFunction::Percentile25,
    FeatureFunction::Percentile75,
    FeatureFunction::Kurtosis,
];

impl FeatureFunction {
    /// Column name prefix for this function.
    pub fn name(self) -> &'static str {
        match self {
            FeatureFunction::MeanCrossings => "mean_crossings",
            FeatureFunction::SpectralEntropy => "spectral_entropy",
            FeatureFunction::ZeroCrossings => "zero_crossings",
            FeatureFunction::InterquartileRange => "interquartile_range",
            FeatureFunction::Skewness => "skewness",
            FeatureFunction::SpectralEnergy => "spectral_energy",
            FeatureFunction::Percentile25 => "percentile_25",
            FeatureFunction::Percentile75 => "percentile_75",
            FeatureFunction::Kurtosis => "kurtosis",
            FeatureFunction::Mean => "mean",
            FeatureFunction::StandardDeviation => "std_dev",
            FeatureFunction::Minimum => "min",
            FeatureFunction::Maximum => "max",
        }
    }
}

/// Column names for a function list, `<function>_<axis>`.
pub fn feature_names(functions: &[FeatureFunction]) -> Vec<String> {
    functions
        .iter()
        .flat_map(|f| {
            Axis::ALL
                .iter()
                .map(move |axis| format!("{}_{}", f.name(), axis.name()))
        })
        .collect()
}

/// Computes feature vectors for windows of accelerometer samples.
pub struct FeatureExtractor {
    functions: Vec<FeatureFunction>,
    planner: FftPlanner<f64>,
}

impl FeatureExtractor {
    pub fn new(functions: &[FeatureFunction]) -> Self {
        Self {
            functions: functions.to_vec(),
            planner: FftPlanner::new(),
        }
    }

    pub fn functions(&self) -> &[FeatureFunction] {
        &self.functions
    }

    /// Number of values produced per window.
    pub fn width(&self) -> usize {
        self.functions.len() * Axis::ALL.len()
    }

    /// Extract all features from one window.
    ///
    /// Non-finite readings are dropped per axis before any statistic is taken.
    pub fn extract(&mut self, window: &[AccelSample]) -> Vec<f64> {
        let channels: Vec<Vec<f64>> = Axis::ALL
            .iter()
            .map(|&axis| {
                window
                    .iter()
                    .map(|s| s.axis(axis))
                    .filter(|v| v.is_finite())
                    .collect()
            })
            .collect();

        let mut features = Vec::with_capacity(self.width());
        for i in 0..self.functions.len() {
            let function = self.functions[i];
            for signal in &channels {
                features.push(self.apply(function, signal));
            }
        }
        features
    }

    /// Apply a single function to a single signal.
    pub fn apply(&mut self, function: FeatureFunction, signal: &[f64]) -> f64 {
        if signal.is_empty() {
            return 0.0;
        }
        match function {
            FeatureFunction::SpectralEntropy => spectral_entropy(&self.power_spectrum(signal)),
            FeatureFunction::SpectralEnergy => self.power_spectrum(signal).iter().sum(),
            FeatureFunction::MeanCrossings => {
                let mean = Statistics::mean(signal.iter());
                sign_changes(signal.iter().map(|v| v - mean))
            }
            FeatureFunction::ZeroCrossings => sign_changes(signal.iter().copied()),
            FeatureFunction::InterquartileRange => {
                let sorted = sorted(signal);
                percentile_sorted(&sorted, 75.0) - percentile_sorted(&sorted, 25.0)
            }
            FeatureFunction::Skewness => skewness(signal),
            FeatureFunction::Percentile25 => percentile(signal, 25.0),
            FeatureFunction::Percentile75 => percentile(signal, 75.0),
            FeatureFunction::Kurtosis => kurtosis(signal),
            FeatureFunction::Mean => Statistics::mean(signal.iter()),
            FeatureFunction::StandardDeviation => Statistics::population_std_dev(signal.iter()),
            FeatureFunction::Minimum => Statistics::min(signal.iter()),
            FeatureFunction::Maximum => Statistics::max(signal.iter()),
        }
    }

    /// One-sided power spectrum `|X_k|^2 / n` for `k = 1..=n/2` (DC excluded).
    fn power_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        // A flat signal has no power outside DC; skip the FFT round-off
        if signal.iter().all(|&v| v == signal[0]) {
            return vec![0.0; n / 2];
        }

        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        buffer
            .iter()
            .take(n / 2 + 1)
            .skip(1)
            .map(|c| c.norm_sqr() / n as f64)
            .collect()
    }
}

/// Count sign changes between consecutive non-zero values.
fn sign_changes(values: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0usize;
    let mut last_positive: Option<bool> = None;
    for v in values {
        if v == 0.0 {
            continue;
        }
        let positive = v > 0.0;
        if let Some(prev) = last_positive {
            if prev != positive {
                count += 1;
            }
        }
        last_positive = Some(positive);
    }
    count as f64
}

fn sorted(signal: &[f64]) -> Vec<f64> {
    let mut values = signal.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(signal: &[f64], p: f64) -> f64 {
    percentile_sorted(&sorted(signal), p)
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Relative precision below which the variance counts as round-off.
const MOMENT_RESOLUTION: f64 = 1e-14;

/// Central moments m2, m3, m4 (population).
///
/// `None` when the variance is indistinguishable from round-off relative to
/// the signal's mean, i.e. the signal is numerically constant.
fn central_moments(signal: &[f64]) -> Option<(f64, f64, f64)> {
    let n = signal.len() as f64;
    let mean = Statistics::mean(signal.iter());
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in signal {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
    if m2 <= (MOMENT_RESOLUTION * mean).powi(2) {
        return None;
    }
    Some((m2, m3, m4))
}

/// Biased sample skewness; 0 for a constant signal.
pub fn skewness(signal: &[f64]) -> f64 {
    if signal.len() < 2 {
        return 0.0;
    }
    match central_moments(signal) {
        Some((m2, m3, _)) => m3 / m2.powf(1.5),
        None => 0.0,
    }
}

/// Biased excess (Fisher) kurtosis; 0 for a constant signal.
pub fn kurtosis(signal: &[f64]) -> f64 {
    if signal.len() < 2 {
        return 0.0;
    }
    match central_moments(signal) {
        Some((m2, _, m4)) => m4 / (m2 * m2) - 3.0,
        None => 0.0,
    }
}

/// Shannon entropy in bits of a power spectrum treated as a distribution.
fn spectral_entropy(power: &[f64]) -> f64 {
    let total: f64 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -power
        .iter()
        .map(|&p| {
            let p = p / total;
            if p > 1e-12 {
                p * p.log2()
            } else {
                0.0
            }
        })
        .sum::<f64>()
}
