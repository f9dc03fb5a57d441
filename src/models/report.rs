use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Daily => "daily",
            ReportKind::Weekly => "weekly",
            ReportKind::Monthly => "monthly",
            ReportKind::Yearly => "yearly",
            ReportKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportKind::Daily),
            "weekly" => Ok(ReportKind::Weekly),
            "monthly" => Ok(ReportKind::Monthly),
            "yearly" => Ok(ReportKind::Yearly),
            "custom" => Ok(ReportKind::Custom),
            other => Err(AppError::validation(format!("unknown report kind: {other}"))),
        }
    }
}

/// Inclusive calendar-date bounds for a report.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Both bounds are mandatory; a start after the end is accepted and simply matches nothing.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Bounds for a report kind as of `today`. Weeks start on Sunday.
    pub fn for_kind(kind: ReportKind, today: NaiveDate) -> Option<Self> {
        let start = match kind {
            ReportKind::Daily => today,
            ReportKind::Weekly => {
                let back = u64::from(today.weekday().num_days_from_sunday());
                today.checked_sub_days(Days::new(back))?
            }
            ReportKind::Monthly => today.with_day(1)?,
            ReportKind::Yearly => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
            ReportKind::Custom => return None,
        };
        Some(Self { start, end: today })
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::invalid_range(format!("{name} date is required")))?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| AppError::invalid_range(format!("{name} date {raw:?}: {err}")))
}

/// A report request as submitted by the date-range picker.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportRequest {
    #[serde(default)]
    pub kind: ReportKind,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ReportRequest {
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, AppError> {
        match DateRange::for_kind(self.kind, today) {
            Some(range) => Ok(range),
            None => DateRange::parse(self.start.as_deref(), self.end.as_deref()),
        }
    }
}
