//! # Data Model
//!
//! Records persisted by both storage backends. Entries are append-only: once
//! written they are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Sentinel stored in place of a time for unscheduled plans
pub const UNSCHEDULED: &str = "-";

/// Metric recorded by the fit tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMetric {
    Steps,
    Calories,
    Weight,
}

impl FitMetric {
    /// Column name in the `fit_tracker` table
    pub fn column(&self) -> &'static str {
        match self {
            FitMetric::Steps => "steps",
            FitMetric::Calories => "calories",
            FitMetric::Weight => "weight",
        }
    }
}

/// A single validated fit tracker value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitReading {
    Steps(i64),
    Calories(i64),
    Weight(f64),
}

impl FitReading {
    pub fn metric(&self) -> FitMetric {
        match self {
            FitReading::Steps(_) => FitMetric::Steps,
            FitReading::Calories(_) => FitMetric::Calories,
            FitReading::Weight(_) => FitMetric::Weight,
        }
    }
}

/// One fit tracker row. Each metric is recorded independently, so a day may
/// have several partial rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitEntry {
    /// Implied by the document key in the JSON store
    #[serde(skip)]
    pub user_id: i64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl FitEntry {
    /// Build a partial row holding just `reading`
    pub fn from_reading(user_id: i64, date: NaiveDate, reading: FitReading) -> Self {
        let mut entry = FitEntry {
            user_id,
            date,
            steps: None,
            calories: None,
            weight: None,
        };
        match reading {
            FitReading::Steps(v) => entry.steps = Some(v),
            FitReading::Calories(v) => entry.calories = Some(v),
            FitReading::Weight(v) => entry.weight = Some(v),
        }
        entry
    }
}

/// Time slot of a plan: a wall-clock time or unscheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlanTime {
    At(NaiveTime),
    Unscheduled,
}

impl PlanTime {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, PlanTime::At(_))
    }
}

impl fmt::Display for PlanTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTime::At(time) => write!(f, "{}", time.format("%H:%M")),
            PlanTime::Unscheduled => f.write_str(UNSCHEDULED),
        }
    }
}

impl FromStr for PlanTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == UNSCHEDULED {
            return Ok(PlanTime::Unscheduled);
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(PlanTime::At)
            .map_err(|e| format!("invalid plan time '{s}': {e}"))
    }
}

impl TryFrom<String> for PlanTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlanTime> for String {
    fn from(value: PlanTime) -> Self {
        value.to_string()
    }
}

/// A dated plan, optionally at a given time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Implied by the document key in the JSON store
    #[serde(skip)]
    pub user_id: i64,
    pub date: NaiveDate,
    pub text: String,
    pub time: PlanTime,
}

/// A wishlist item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// Implied by the document key in the JSON store
    #[serde(skip)]
    pub user_id: i64,
    pub link: String,
    pub title: String,
    pub category: String,
}

impl WishlistEntry {
    /// Case-insensitive category comparison (Unicode aware, so "Книги"
    /// matches "книги")
    pub fn in_category(&self, category: &str) -> bool {
        self.category.trim().to_lowercase() == category.trim().to_lowercase()
    }
}

/// Distinct categories of `entries`, in first-seen order. Categories differing
/// only by case are reported once.
pub fn distinct_categories(entries: &[WishlistEntry]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    let mut categories = Vec::new();
    for entry in entries {
        let key = entry.category.trim().to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            categories.push(entry.category.trim().to_string());
        }
    }
    categories
}
