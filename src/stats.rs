//! # Fit Statistics
//!
//! Weekly and monthly aggregation of fit tracker rows.
//!
//! Because every metric is stored as its own partial row, the choice of
//! denominator for averages matters. [`AveragePolicy::PerRow`] divides by the
//! number of rows returned for the period, matching the historical reports;
//! the other policies are available for callers that want per-value or
//! per-day averages.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::AssistantError;
use crate::models::FitEntry;

/// Aggregation period, anchored on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    /// Monday through Sunday of the anchor's week
    Week,
    /// First through last day of the anchor's month
    Month,
}

impl StatsPeriod {
    /// Inclusive date range of the period containing `today`
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            StatsPeriod::Week => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (start, start + Duration::days(6))
            }
            StatsPeriod::Month => {
                let start = today.with_day(1).unwrap_or(today);
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next_month
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(start);
                (start, end)
            }
        }
    }
}

/// Denominator used when averaging steps and calories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AveragePolicy {
    /// Sum divided by every row in the period, including rows that hold a
    /// different metric
    #[default]
    PerRow,
    /// Sum divided by the number of rows that actually hold the metric
    PerObservation,
    /// Sum divided by the number of distinct dates in the period
    PerDay,
}

impl FromStr for AveragePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rows" | "per_row" => Ok(AveragePolicy::PerRow),
            "observations" | "per_observation" => Ok(AveragePolicy::PerObservation),
            "days" | "per_day" => Ok(AveragePolicy::PerDay),
            other => Err(format!("unknown average policy '{other}'")),
        }
    }
}

/// Aggregated stats for one period
#[derive(Debug, Clone, PartialEq)]
pub struct FitStats {
    /// Last non-null weight observed in the period
    pub latest_weight: Option<f64>,
    pub average_steps: i64,
    pub average_calories: i64,
    /// Rows the stats were computed from
    pub rows: usize,
}

fn average(total: i64, denominator: usize) -> i64 {
    if denominator == 0 {
        0
    } else {
        total / denominator as i64
    }
}

/// Aggregate `entries` (ordered by date then insertion). An empty slice is
/// `NotFound` rather than a division by zero.
pub fn aggregate(entries: &[FitEntry], policy: AveragePolicy) -> Result<FitStats, AssistantError> {
    if entries.is_empty() {
        return Err(AssistantError::NotFound("no fit tracker rows in period".to_string()));
    }

    let latest_weight = entries.iter().rev().find_map(|entry| entry.weight);
    let steps: Vec<i64> = entries.iter().filter_map(|entry| entry.steps).collect();
    let calories: Vec<i64> = entries.iter().filter_map(|entry| entry.calories).collect();

    let (steps_denominator, calories_denominator) = match policy {
        AveragePolicy::PerRow => (entries.len(), entries.len()),
        AveragePolicy::PerObservation => (steps.len(), calories.len()),
        AveragePolicy::PerDay => {
            let days = entries.iter().map(|entry| entry.date).collect::<BTreeSet<_>>().len();
            (days, days)
        }
    };

    Ok(FitStats {
        latest_weight,
        average_steps: average(steps.iter().sum(), steps_denominator),
        average_calories: average(calories.iter().sum(), calories_denominator),
        rows: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FitReading;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(d: u32, reading: FitReading) -> FitEntry {
        FitEntry::from_reading(1, date(2026, 10, d), reading)
    }

    #[test]
    fn test_week_range_starts_on_monday() {
        // 2026-10-17 is a Saturday
        let (start, end) = StatsPeriod::Week.range(date(2026, 10, 17));
        assert_eq!(start, date(2026, 10, 12));
        assert_eq!(end, date(2026, 10, 18));

        let (start, end) = StatsPeriod::Week.range(date(2026, 10, 12));
        assert_eq!((start, end), (date(2026, 10, 12), date(2026, 10, 18)));
    }

    #[test]
    fn test_month_range() {
        assert_eq!(
            StatsPeriod::Month.range(date(2026, 10, 17)),
            (date(2026, 10, 1), date(2026, 10, 31))
        );
        assert_eq!(
            StatsPeriod::Month.range(date(2028, 2, 10)),
            (date(2028, 2, 1), date(2028, 2, 29))
        );
        assert_eq!(
            StatsPeriod::Month.range(date(2026, 12, 31)),
            (date(2026, 12, 1), date(2026, 12, 31))
        );
    }

    #[test]
    fn test_empty_period_is_not_found() {
        let result = aggregate(&[], AveragePolicy::PerRow);
        assert!(matches!(result, Err(AssistantError::NotFound(_))));
    }

    #[test]
    fn test_per_row_denominator_counts_partial_rows() {
        let rows = vec![
            row(12, FitReading::Steps(5000)),
            row(14, FitReading::Calories(300)),
        ];

        let stats = aggregate(&rows, AveragePolicy::PerRow).unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.average_steps, 2500);
        assert_eq!(stats.average_calories, 150);
        assert_eq!(stats.latest_weight, None);
    }

    #[test]
    fn test_per_observation_and_per_day() {
        let rows = vec![
            row(12, FitReading::Steps(5000)),
            row(12, FitReading::Calories(300)),
            row(13, FitReading::Steps(7000)),
        ];

        let stats = aggregate(&rows, AveragePolicy::PerObservation).unwrap();
        assert_eq!(stats.average_steps, 6000);
        assert_eq!(stats.average_calories, 300);

        let stats = aggregate(&rows, AveragePolicy::PerDay).unwrap();
        assert_eq!(stats.average_steps, 6000);
        assert_eq!(stats.average_calories, 150);
    }

    #[test]
    fn test_latest_weight_is_last_non_null() {
        let rows = vec![
            row(12, FitReading::Weight(71.2)),
            row(13, FitReading::Weight(70.8)),
            row(14, FitReading::Steps(100)),
        ];

        let stats = aggregate(&rows, AveragePolicy::PerRow).unwrap();
        assert_eq!(stats.latest_weight, Some(70.8));
    }

    #[test]
    fn test_average_floors() {
        let rows = vec![
            row(12, FitReading::Steps(1001)),
            row(13, FitReading::Steps(1000)),
        ];
        assert_eq!(aggregate(&rows, AveragePolicy::PerRow).unwrap().average_steps, 1000);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("rows".parse::<AveragePolicy>().unwrap(), AveragePolicy::PerRow);
        assert_eq!("Days".parse::<AveragePolicy>().unwrap(), AveragePolicy::PerDay);
        assert_eq!(
            "observations".parse::<AveragePolicy>().unwrap(),
            AveragePolicy::PerObservation
        );
        assert!("median".parse::<AveragePolicy>().is_err());
    }
}
