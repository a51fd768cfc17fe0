//! Splits a crash timestamp into the calendar columns of the date dimension.

use std::fmt;

use chrono::{Datelike, NaiveDateTime};

use crate::{
    data::{Value, display_cell},
    error::{Result, TableError},
    table::Table,
};

/// `03/15/2020 02:30:00 PM`
pub const CRASH_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

pub const MONTH_COLUMN: &str = "CRASH_MONTH";
pub const DAY_COLUMN: &str = "CRASH_DAY";
pub const YEAR_COLUMN: &str = "CRASH_YEAR";
pub const TIME_COLUMN: &str = "CRASH_TIME";
pub const PERIOD_COLUMN: &str = "CRASH_PERIOD";
pub const SEASON_COLUMN: &str = "CRASH_SEASON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Autumn => "AUTUMN",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text parts of a decomposed timestamp, formatted as they are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParts {
    pub month: String,
    pub day: String,
    pub year: String,
    pub time: String,
    pub period: String,
    pub season: Season,
}

pub fn decompose(value: &str, format: &str) -> Result<DateParts> {
    let parsed =
        NaiveDateTime::parse_from_str(value.trim(), format).map_err(|_| TableError::DateTimeParse {
            value: value.to_string(),
            format: format.to_string(),
        })?;
    Ok(DateParts {
        month: format!("{:02}", parsed.month()),
        day: format!("{:02}", parsed.day()),
        year: parsed.year().to_string(),
        time: parsed.format("%I:%M:%S").to_string(),
        period: parsed.format("%p").to_string(),
        season: Season::from_month(parsed.month()),
    })
}

/// Adds the six calendar columns derived from `column`. The source column
/// is kept. Any row that fails to parse aborts the pass.
pub fn split_datetime(table: &mut Table, column: &str, format: &str) -> Result<()> {
    if !table.has_column(column) {
        return Err(TableError::missing(column));
    }
    for target in [
        MONTH_COLUMN,
        DAY_COLUMN,
        YEAR_COLUMN,
        TIME_COLUMN,
        PERIOD_COLUMN,
        SEASON_COLUMN,
    ] {
        table.add_column(target, None)?;
    }
    table.try_for_each_row(|mut row| {
        let raw = display_cell(row.get(column));
        let parts = decompose(&raw, format)?;
        row.set(MONTH_COLUMN, Some(Value::String(parts.month)))?;
        row.set(DAY_COLUMN, Some(Value::String(parts.day)))?;
        row.set(YEAR_COLUMN, Some(Value::String(parts.year)))?;
        row.set(TIME_COLUMN, Some(Value::String(parts.time)))?;
        row.set(PERIOD_COLUMN, Some(Value::String(parts.period)))?;
        row.set(SEASON_COLUMN, Some(Value::from(parts.season.as_str())))
    })
}
