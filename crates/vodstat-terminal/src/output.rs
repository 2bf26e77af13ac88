//! Output formatting module for vodstat
//!
//! This module provides formatters for displaying visit reports in different formats:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and integration with other tools
//!
//! # Examples
//!
//! ```
//! use vodstat_core::aggregation_types::{DailyStats, MonthlyStats};
//! use vodstat_core::types::{DaySelector, MonthSelector};
//! use vodstat_terminal::output::get_formatter;
//!
//! let mut day = DailyStats::empty(DaySelector::new(2016, 6, 6).unwrap());
//! day.totals.visit_count = 2;
//! day.totals.total_seconds = 3600;
//! let month = MonthlyStats::from_days(MonthSelector::new(2016, 6).unwrap(), vec![day]);
//!
//! let table = get_formatter(false, false, chrono_tz::UTC);
//! assert!(table.format_month(&month).contains("3,600"));
//!
//! let json = get_formatter(true, false, chrono_tz::UTC);
//! assert!(json.format_month(&month).contains("\"visit_count\": 2"));
//! ```

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use prettytable::{Cell, Row, Table, format, row};
use serde_json::{Value, json};
use tracing::error;
use vodstat_core::aggregation_types::{DailyStats, MonthlyStats, Totals, Visit, YearlyStats};

/// Trait for output formatters
///
/// One method per report scope. Implementations decide how much of the
/// detail carried by the stats they render.
pub trait OutputFormatter {
    /// Format a single day, including per-visit rows when present
    fn format_day(&self, data: &DailyStats) -> String;

    /// Format one row per day plus the month total
    fn format_month(&self, data: &MonthlyStats) -> String;

    /// Format one row per month plus the year total
    fn format_year(&self, data: &YearlyStats) -> String;
}

/// Table formatter for human-readable output
///
/// Numbers are printed with thousands separators and visit boundaries in
/// the timezone the logs were read in.
pub struct TableFormatter {
    /// Add the ignored-cohort columns
    pub show_ignored: bool,
    /// Timezone for visit boundaries
    pub tz: Tz,
}

impl TableFormatter {
    pub fn new(show_ignored: bool, tz: Tz) -> Self {
        Self { show_ignored, tz }
    }

    /// Format a number with thousands separators
    fn format_number(n: u64) -> String {
        let s = n.to_string();
        let mut result = String::new();

        for (count, ch) in s.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                result.push(',');
            }
            result.push(ch);
        }

        result.chars().rev().collect()
    }

    fn format_time(&self, dt: &DateTime<Utc>) -> String {
        dt.with_timezone(&self.tz).format("%H:%M:%S").to_string()
    }

    fn column_count(&self) -> usize {
        if self.show_ignored { 7 } else { 4 }
    }

    fn titles(&self, label: &str) -> Row {
        let mut titles = vec![label, "Visits", "Seconds", "Data"];
        if self.show_ignored {
            titles.extend(["Ignored Visits", "Ignored Seconds", "Ignored Data"]);
        }
        Row::new(titles.into_iter().map(|t| Cell::new(t).style_spec("b")).collect())
    }

    fn totals_row(&self, label: &str, totals: &Totals, bold: bool) -> Row {
        let style = if bold { "br" } else { "r" };
        let mut cells = vec![
            Cell::new(label).style_spec(if bold { "b" } else { "" }),
            Cell::new(&Self::format_number(totals.visit_count)).style_spec(style),
            Cell::new(&Self::format_number(totals.total_seconds)).style_spec(style),
            Cell::new(&Self::format_number(totals.total_bytes)).style_spec(style),
        ];
        if self.show_ignored {
            cells.extend([
                Cell::new(&Self::format_number(totals.ignored_visit_count)).style_spec(style),
                Cell::new(&Self::format_number(totals.ignored_seconds)).style_spec(style),
                Cell::new(&Self::format_number(totals.ignored_bytes)).style_spec(style),
            ]);
        }
        Row::new(cells)
    }

    fn visit_table(&self, visits: &[Visit]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        let estimated = visits.iter().any(|v| v.estimated_bytes > 0);
        if estimated {
            table.set_titles(row![b -> "IP", b -> "First", b -> "Last", b -> "Seconds", b -> "Asset", b -> "Data"]);
        } else {
            table.set_titles(row![b -> "IP", b -> "First", b -> "Last", b -> "Seconds", b -> "Asset"]);
        }

        for visit in visits {
            let mut line = row![
                visit.client_id,
                self.format_time(&visit.first_seen),
                self.format_time(&visit.last_seen),
                r -> Self::format_number(visit.duration_seconds),
                visit.asset
            ];
            if estimated {
                line.add_cell(Cell::new(&Self::format_number(visit.estimated_bytes)).style_spec("r"));
            }
            table.add_row(line);
        }

        table.to_string()
    }
}

impl OutputFormatter for TableFormatter {
    fn format_day(&self, data: &DailyStats) -> String {
        let mut output = String::new();

        if let Some(ref visits) = data.visits {
            output.push_str(&format!("\n=== Visits {} ===\n", data.date));
            output.push_str(&self.visit_table(visits));
        }

        if let (true, Some(visits)) = (self.show_ignored, &data.ignored_visits) {
            output.push_str(&format!("\n=== Ignored visits {} ===\n", data.date));
            output.push_str(&self.visit_table(visits));
        }

        if !output.is_empty() {
            output.push('\n');
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(self.titles("Day"));
        table.add_row(self.totals_row(&data.date.to_string(), &data.totals, false));
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n{} clients",
            Self::format_number(data.client_count as u64)
        ));
        if self.show_ignored {
            output.push_str(&format!(", {} ignored", data.ignored_client_count));
        }
        output.push('\n');

        if data.skipped_timestamps > 0 {
            output.push_str(&format!(
                "{} lines skipped (unusable timestamp)\n",
                data.skipped_timestamps
            ));
        }

        output
    }

    fn format_month(&self, data: &MonthlyStats) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(self.titles("Day"));

        for day in &data.days {
            table.add_row(self.totals_row(&day.date.to_string(), &day.totals, false));
        }

        // Add separator
        table.add_row(Row::new(vec![Cell::new(""); self.column_count()]));

        table.add_row(self.totals_row("TOTAL", &data.totals, true));

        format!(
            "{}\n{} active days in {}\n",
            table, data.active_days, data.month
        )
    }

    fn format_year(&self, data: &YearlyStats) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(self.titles("Month"));

        for month in &data.months {
            table.add_row(self.totals_row(&month.month.label(), &month.totals, false));
        }

        table.add_row(Row::new(vec![Cell::new(""); self.column_count()]));
        table.add_row(self.totals_row("TOTAL", &data.totals, true));

        table.to_string()
    }
}

/// JSON formatter for machine-readable output
///
/// The stats are emitted as-is; detail rows appear only when they were
/// collected.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render(value: Value) -> String {
        serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
            error!("Failed to render JSON report: {}", e);
            String::from("{}")
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_day(&self, data: &DailyStats) -> String {
        Self::render(json!({ "day": data }))
    }

    fn format_month(&self, data: &MonthlyStats) -> String {
        Self::render(json!({ "month": data }))
    }

    fn format_year(&self, data: &YearlyStats) -> String {
        Self::render(json!({ "year": data }))
    }
}

/// Get appropriate formatter based on JSON flag
///
/// # Arguments
///
/// * `json` - If true, returns a JSON formatter; otherwise returns a table formatter
/// * `show_ignored` - Whether the table shows the ignored-cohort columns
/// * `tz` - Timezone for visit boundaries in tables
pub fn get_formatter(json: bool, show_ignored: bool, tz: Tz) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::new(show_ignored, tz))
    }
}
