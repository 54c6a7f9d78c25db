//! Behavioural summaries over labelled epochs.
//!
//! Each window becomes an epoch: a label, a timestamp and a fixed duration.
//! Epochs are grouped into local-time hours or days of the configured zone
//! and every requested metric is evaluated per group.

pub mod summary;

pub use summary::{Granularity, SummaryRow, SummaryTable};

use crate::error::{PipelineError, Result};
use crate::source::types::Label;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Metrics that can be evaluated per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Seconds spent in epochs carrying the sitting label
    DurationSitting,
    /// Distinct labels seen
    NumberOfUniqueActivities,
    /// Label changes between consecutive epochs
    NumberOfTransitions,
    /// Most common label, lowest label on ties
    MostFrequentActivity,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::DurationSitting,
        MetricKind::NumberOfUniqueActivities,
        MetricKind::NumberOfTransitions,
        MetricKind::MostFrequentActivity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::DurationSitting => "duration_sitting",
            MetricKind::NumberOfUniqueActivities => "number_of_unique_activities",
            MetricKind::NumberOfTransitions => "number_of_transitions",
            MetricKind::MostFrequentActivity => "most_frequent_activity",
        }
    }
}

/// Metric settings stored in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Label that counts as sitting
    pub sitting_label: Label,
    /// IANA zone name used to place period boundaries
    pub timezone: String,
    /// Metrics to compute, in column order
    pub metrics: Vec<MetricKind>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sitting_label: 1,
            timezone: "UTC".to_string(),
            metrics: vec![
                MetricKind::DurationSitting,
                MetricKind::NumberOfUniqueActivities,
            ],
        }
    }
}

impl MetricsConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            PipelineError::parameters(format!("unknown time zone '{}'", self.timezone))
        })
    }
}

/// Labelled epochs bucketed by period.
#[derive(Debug, Clone)]
pub struct ActivityMetrics {
    granularity: Granularity,
    tz: Tz,
    sitting_label: Label,
    epoch: Duration,
    periods: BTreeMap<NaiveDateTime, Vec<Label>>,
}

impl ActivityMetrics {
    /// Group `labels` by the period of the matching timestamp.
    ///
    /// Epoch duration defaults to the smallest positive gap between
    /// consecutive timestamps; override it with [`ActivityMetrics::with_epoch`].
    pub fn new(
        labels: &[Label],
        timestamps: &[DateTime<Utc>],
        granularity: Granularity,
        config: &MetricsConfig,
    ) -> Result<Self> {
        if labels.len() != timestamps.len() {
            return Err(PipelineError::length_mismatch(timestamps.len(), labels.len()));
        }
        let tz = config.tz()?;

        let mut epochs: Vec<(DateTime<Utc>, Label)> =
            timestamps.iter().copied().zip(labels.iter().copied()).collect();
        epochs.sort_by_key(|&(ts, _)| ts);

        let epoch = epochs
            .windows(2)
            .map(|pair| pair[1].0 - pair[0].0)
            .filter(|gap| *gap > Duration::zero())
            .min()
            .unwrap_or_else(Duration::zero);

        let mut periods: BTreeMap<NaiveDateTime, Vec<Label>> = BTreeMap::new();
        for (ts, label) in epochs {
            periods
                .entry(period_start(ts, tz, granularity))
                .or_default()
                .push(label);
        }
        debug!(
            granularity = %granularity,
            periods = periods.len(),
            epochs = labels.len(),
            "epochs grouped"
        );

        Ok(Self {
            granularity,
            tz,
            sitting_label: config.sitting_label,
            epoch,
            periods,
        })
    }

    pub fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn epoch(&self) -> Duration {
        self.epoch
    }

    pub fn n_periods(&self) -> usize {
        self.periods.len()
    }

    /// Evaluate one metric over a period's labels.
    pub fn evaluate(&self, kind: MetricKind, labels: &[Label]) -> f64 {
        match kind {
            MetricKind::DurationSitting => {
                let sitting = labels.iter().filter(|&&l| l == self.sitting_label).count();
                sitting as f64 * self.epoch.num_milliseconds() as f64 / 1000.0
            }
            MetricKind::NumberOfUniqueActivities => {
                let mut unique = labels.to_vec();
                unique.sort_unstable();
                unique.dedup();
                unique.len() as f64
            }
            MetricKind::NumberOfTransitions => {
                labels.windows(2).filter(|pair| pair[0] != pair[1]).count() as f64
            }
            MetricKind::MostFrequentActivity => {
                let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
                for &label in labels {
                    *counts.entry(label).or_insert(0) += 1;
                }
                let mut best: Option<(Label, usize)> = None;
                for (label, count) in counts {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((label, count));
                    }
                }
                best.map_or(f64::NAN, |(label, _)| label as f64)
            }
        }
    }

    /// One table with a row per period and a column per requested metric.
    pub fn run_metric_array(&self, kinds: &[MetricKind]) -> SummaryTable {
        let rows = self
            .periods
            .iter()
            .map(|(&period_start, labels)| SummaryRow {
                period_start,
                epochs: labels.len(),
                values: kinds.iter().map(|&kind| self.evaluate(kind, labels)).collect(),
            })
            .collect();

        SummaryTable {
            granularity: self.granularity,
            timezone: self.tz.name().to_string(),
            columns: kinds.iter().map(|k| k.name().to_string()).collect(),
            rows,
        }
    }
}

/// Local start of the hour or day containing `ts`.
fn period_start(ts: DateTime<Utc>, tz: Tz, granularity: Granularity) -> NaiveDateTime {
    let local = ts.with_timezone(&tz).naive_local();
    let midnight = local.date().and_time(NaiveTime::MIN);
    match granularity {
        Granularity::Daily => midnight,
        Granularity::Hourly => midnight + Duration::hours(i64::from(local.hour())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epochs(start_hour: u32, labels: &[Label]) -> (Vec<Label>, Vec<DateTime<Utc>>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 22, start_hour, 59, 0).unwrap();
        let timestamps = (0..labels.len())
            .map(|i| start + Duration::seconds(9 * i as i64))
            .collect();
        (labels.to_vec(), timestamps)
    }

    #[test]
    fn test_hourly_buckets() {
        // 10 epochs 9 s apart from 09:59:00: 7 in the 09:00 hour, 3 in the 10:00 hour
        let (labels, timestamps) = epochs(9, &[1, 1, 2, 2, 1, 1, 1, 3, 1, 3]);
        let metrics = ActivityMetrics::new(
            &labels,
            &timestamps,
            Granularity::Hourly,
            &MetricsConfig::default(),
        )
        .unwrap();

        assert_eq!(metrics.epoch(), Duration::seconds(9));
        let table = metrics.run_metric_array(&MetricKind::ALL);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.rows[0].epochs, 7);
        assert_eq!(table.rows[1].epochs, 3);
        assert_eq!(table.rows[0].period_start.hour(), 9);
        assert_eq!(table.column("duration_sitting"), Some(vec![45.0, 9.0]));
        assert_eq!(table.column("number_of_unique_activities"), Some(vec![2.0, 2.0]));
        assert_eq!(table.column("number_of_transitions"), Some(vec![2.0, 2.0]));
        assert_eq!(table.column("most_frequent_activity"), Some(vec![1.0, 3.0]));
    }

    #[test]
    fn test_daily_single_period() {
        let (labels, timestamps) = epochs(9, &[1, 2, 3, 4]);
        let metrics = ActivityMetrics::new(
            &labels,
            &timestamps,
            Granularity::Daily,
            &MetricsConfig::default(),
        )
        .unwrap()
        .with_epoch(Duration::seconds(10));

        let table = metrics.run_metric_array(&[MetricKind::DurationSitting]);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.rows[0].values, vec![10.0]);
        assert_eq!(table.rows[0].period_start.hour(), 0);
    }

    #[test]
    fn test_timezone_shifts_day_boundary() {
        // 23:30 UTC is already the next day in Berlin
        let ts = vec![
            Utc.with_ymd_and_hms(2024, 1, 22, 22, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 22, 23, 30, 0).unwrap(),
        ];
        let config = MetricsConfig {
            timezone: "Europe/Berlin".to_string(),
            ..MetricsConfig::default()
        };
        let utc = ActivityMetrics::new(&[1, 1], &ts, Granularity::Daily, &MetricsConfig::default())
            .unwrap();
        let berlin = ActivityMetrics::new(&[1, 1], &ts, Granularity::Daily, &config).unwrap();

        assert_eq!(utc.n_periods(), 1);
        assert_eq!(berlin.n_periods(), 2);
        assert_eq!(
            berlin.run_metric_array(&[MetricKind::NumberOfUniqueActivities]).timezone,
            "Europe/Berlin"
        );
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let base = Utc.with_ymd_and_hms(2024, 1, 22, 9, 0, 0).unwrap();
        let ts = vec![base + Duration::seconds(20), base, base + Duration::seconds(10)];
        let metrics =
            ActivityMetrics::new(&[2, 1, 1], &ts, Granularity::Hourly, &MetricsConfig::default())
                .unwrap();
        // Ordered labels are [1, 1, 2]: one transition
        let table = metrics.run_metric_array(&[MetricKind::NumberOfTransitions]);
        assert_eq!(table.rows[0].values, vec![1.0]);
    }

    #[test]
    fn test_invalid_inputs() {
        let ts = vec![Utc::now()];
        assert!(
            ActivityMetrics::new(&[1, 2], &ts, Granularity::Daily, &MetricsConfig::default())
                .is_err()
        );

        let bad_zone = MetricsConfig {
            timezone: "Mars/Olympus".to_string(),
            ..MetricsConfig::default()
        };
        assert!(ActivityMetrics::new(&[1], &ts, Granularity::Daily, &bad_zone).is_err());
    }

    #[test]
    fn test_empty_input() {
        let metrics =
            ActivityMetrics::new(&[], &[], Granularity::Hourly, &MetricsConfig::default()).unwrap();
        assert!(metrics.run_metric_array(&MetricKind::ALL).is_empty());
    }
}
