//! Per-period summary tables.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the periods a summary table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn name(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One period of a summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Start of the period in local time of the configured zone
    pub period_start: NaiveDateTime,
    /// Number of epochs that fell into the period
    pub epochs: usize,
    /// One value per column
    pub values: Vec<f64>,
}

/// Metric values grouped by period, chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub granularity: Granularity,
    pub timezone: String,
    pub columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let period_format = match self.granularity {
            Granularity::Hourly => "%Y-%m-%d %H:00",
            Granularity::Daily => "%Y-%m-%d",
        };
        let widths: Vec<usize> = self.columns.iter().map(|c| c.len().max(8)).collect();

        write!(f, "{:<16} {:>6}", "period", "epochs")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, " {column:>width$}")?;
        }
        writeln!(f)?;

        for row in &self.rows {
            write!(
                f,
                "{:<16} {:>6}",
                row.period_start.format(period_format).to_string(),
                row.epochs
            )?;
            for (value, width) in row.values.iter().zip(&widths) {
                if value.fract() == 0.0 {
                    write!(f, " {value:>width$}")?;
                } else {
                    write!(f, " {value:>width$.1}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table() -> SummaryTable {
        let day = NaiveDate::from_ymd_opt(2024, 1, 22).unwrap();
        SummaryTable {
            granularity: Granularity::Hourly,
            timezone: "UTC".to_string(),
            columns: vec!["duration_sitting".to_string(), "number_of_transitions".to_string()],
            rows: vec![
                SummaryRow {
                    period_start: day.and_hms_opt(9, 0, 0).unwrap(),
                    epochs: 4,
                    values: vec![36.0, 1.0],
                },
                SummaryRow {
                    period_start: day.and_hms_opt(10, 0, 0).unwrap(),
                    epochs: 2,
                    values: vec![4.5, 0.0],
                },
            ],
        }
    }

    #[test]
    fn test_column_lookup() {
        let table = table();
        assert_eq!(table.column("duration_sitting"), Some(vec![36.0, 4.5]));
        assert_eq!(table.column("missing"), None);
    }

    #[test]
    fn test_display() {
        let text = table().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("duration_sitting"));
        assert!(lines[1].starts_with("2024-01-22 09:00"));
        assert!(lines[2].contains("4.5"));
    }
}
