//! Aggregation data types for vodstat
//!
//! Pure data structures produced by the session aggregator and consumed by
//! the presentation layer. These types have no dependencies on the filter or
//! the data loader.

use crate::types::{ClientId, DaySelector, MonthSelector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// One reconstructed viewing session of a single client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Client the visit belongs to
    pub client_id: ClientId,
    /// Timestamp of the opening hit
    pub first_seen: DateTime<Utc>,
    /// Timestamp of the last hit that extended the visit
    pub last_seen: DateTime<Utc>,
    /// `last_seen - first_seen`, never negative
    pub duration_seconds: u64,
    /// Asset of the opening hit
    pub asset: String,
    /// Bytes attributed to this visit by the estimated model (0 in direct mode)
    pub estimated_bytes: u64,
}

/// Visit, watch-time, and traffic counters
///
/// The same shape serves a single day and any rollup over days; rollups are
/// the pointwise sum of their days.
///
/// # Examples
/// ```
/// use vodstat_core::aggregation_types::Totals;
///
/// let a = Totals { visit_count: 2, total_seconds: 3600, ..Default::default() };
/// let b = Totals { visit_count: 1, total_bytes: 512, ..Default::default() };
/// let sum: Totals = [a, b].into_iter().sum();
/// assert_eq!(sum.visit_count, 3);
/// assert_eq!(sum.total_seconds, 3600);
/// assert_eq!(sum.total_bytes, 512);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub visit_count: u64,
    pub total_seconds: u64,
    /// Logged bytes in direct mode, estimated bytes otherwise
    pub total_bytes: u64,
    pub ignored_visit_count: u64,
    pub ignored_seconds: u64,
    pub ignored_bytes: u64,
}

/// Totals of one day
pub type DayTotals = Totals;

/// Totals of a month, a year, or any other set of days
pub type PeriodTotals = Totals;

impl Totals {
    pub fn from_daily(daily: &[DailyStats]) -> Self {
        daily.iter().map(|d| d.totals).sum()
    }

    pub fn from_monthly(monthly: &[MonthlyStats]) -> Self {
        monthly.iter().map(|m| m.totals).sum()
    }

    /// Whether anything at all was counted
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            visit_count: self.visit_count + other.visit_count,
            total_seconds: self.total_seconds + other.total_seconds,
            total_bytes: self.total_bytes + other.total_bytes,
            ignored_visit_count: self.ignored_visit_count + other.ignored_visit_count,
            ignored_seconds: self.ignored_seconds + other.ignored_seconds,
            ignored_bytes: self.ignored_bytes + other.ignored_bytes,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, t| acc + t)
    }
}

/// Result of aggregating one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: DaySelector,
    pub totals: DayTotals,
    /// Distinct clients counted in the primary totals
    pub client_count: usize,
    /// Distinct clients found in the ignore set
    pub ignored_client_count: usize,
    /// Lines that passed every check but carried an unusable timestamp
    pub skipped_timestamps: usize,
    /// One row per primary visit (only populated in detailed mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<Vec<Visit>>,
    /// One row per ignored-cohort visit (only populated in detailed mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_visits: Option<Vec<Visit>>,
}

impl DailyStats {
    /// A day without any qualifying record
    pub fn empty(date: DaySelector) -> Self {
        Self {
            date,
            totals: DayTotals::default(),
            client_count: 0,
            ignored_client_count: 0,
            skipped_timestamps: 0,
            visits: None,
            ignored_visits: None,
        }
    }
}

/// Rollup of the requested days of one month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub month: MonthSelector,
    pub totals: PeriodTotals,
    /// Days with at least one visit (primary or ignored)
    pub active_days: usize,
    /// Per-day rows, sorted by date
    pub days: Vec<DailyStats>,
}

impl MonthlyStats {
    pub fn from_days(month: MonthSelector, mut days: Vec<DailyStats>) -> Self {
        days.sort_by_key(|d| d.date);
        let totals = Totals::from_daily(&days);
        let active_days = days
            .iter()
            .filter(|d| d.totals.visit_count + d.totals.ignored_visit_count > 0)
            .count();
        Self {
            month,
            totals,
            active_days,
            days,
        }
    }
}

/// Rollup of a whole year
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyStats {
    pub year: i32,
    pub totals: PeriodTotals,
    /// One entry per month, January first
    pub months: Vec<MonthlyStats>,
}

impl YearlyStats {
    pub fn from_months(year: i32, mut months: Vec<MonthlyStats>) -> Self {
        months.sort_by_key(|m| m.month);
        Self {
            year,
            totals: Totals::from_monthly(&months),
            months,
        }
    }
}
