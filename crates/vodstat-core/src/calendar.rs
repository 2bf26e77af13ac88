//! Month length table used by the period rollups

use serde::{Deserialize, Serialize};

/// Days per month with February fixed at 28
pub const FIXED_DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// How many days a month contributes to a rollup
///
/// `Fixed` ignores leap years, so 29 February is never reported. This is the
/// historical behaviour of the monthly and yearly reports and stays the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTable {
    #[default]
    Fixed,
    Gregorian,
}

impl DayTable {
    /// Number of days in `month` (1-12) of `year`
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        let base = FIXED_DAYS_IN_MONTH[(month - 1) as usize];
        match self {
            Self::Fixed => base,
            Self::Gregorian if month == 2 && is_leap_year(year) => 29,
            Self::Gregorian => base,
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_table_ignores_leap_years() {
        assert_eq!(DayTable::Fixed.days_in_month(2016, 2), 28);
        assert_eq!(DayTable::Fixed.days_in_month(2016, 7), 31);
        let total: u32 = (1..=12).map(|m| DayTable::Fixed.days_in_month(2016, m)).sum();
        assert_eq!(total, 365);
    }

    #[test]
    fn test_gregorian_table() {
        assert_eq!(DayTable::Gregorian.days_in_month(2016, 2), 29);
        assert_eq!(DayTable::Gregorian.days_in_month(1900, 2), 28);
        assert_eq!(DayTable::Gregorian.days_in_month(2000, 2), 29);
        assert_eq!(DayTable::Gregorian.days_in_month(2017, 2), 28);
    }
}
