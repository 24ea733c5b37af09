//! Timestamp parsing and calendar feature derivation.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use super::ProcessError;
use crate::config::FeatureConfig;
use crate::table::{Cell, Column, ColumnData, Table};

const NAIVE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
];

const OFFSET_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
    ),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse an ISO-8601 style timestamp.
///
/// Values with an offset keep their own wall-clock date and time; the offset is dropped.
pub fn parse_timestamp(value: &str) -> Option<PrimitiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(wall_clock(parsed));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = OffsetDateTime::parse(value, *format) {
            return Some(wall_clock(parsed));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = PrimitiveDateTime::parse(value, *format) {
            return Some(parsed);
        }
    }
    Date::parse(value, DATE_FORMAT).ok().map(Date::midnight)
}

fn wall_clock(value: OffsetDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(value.date(), value.time())
}

/// Convert `column` to timestamps, failing on the first unparseable value.
fn to_timestamps(column: &Column) -> Result<Vec<Option<PrimitiveDateTime>>, ProcessError> {
    if let ColumnData::Timestamp(values) = column.data() {
        return Ok(values.clone());
    }
    (0..column.len())
        .map(|row| match column.cell(row) {
            Cell::Null => Ok(None),
            cell => {
                let text = cell.to_string();
                parse_timestamp(&text)
                    .map(Some)
                    .ok_or_else(|| ProcessError::TimestampParse {
                        column: column.name().to_string(),
                        row,
                        value: text,
                    })
            }
        })
        .collect()
}

/// Build an integer column, or a nullable float column when any source value is missing.
fn derived_column(
    name: &str,
    timestamps: &[Option<PrimitiveDateTime>],
    extract: impl Fn(PrimitiveDateTime) -> u8,
) -> Column {
    if timestamps.iter().all(Option::is_some) {
        Column::int(
            name,
            timestamps
                .iter()
                .flatten()
                .map(|&ts| i64::from(extract(ts)))
                .collect(),
        )
    } else {
        Column::float(
            name,
            timestamps
                .iter()
                .map(|ts| ts.map(|ts| f64::from(extract(ts))))
                .collect(),
        )
    }
}

/// Parse the timestamp column in place and add hour-of-day and day-of-month columns.
///
/// Returns `false` without touching the table when the timestamp column is
/// absent, unless the configuration requires it.
pub fn derive_calendar_features(
    table: &mut Table,
    config: &FeatureConfig,
) -> Result<bool, ProcessError> {
    let Some(source) = table.column(&config.timestamp_column) else {
        if config.require_timestamp {
            return Err(ProcessError::MissingColumn {
                column: config.timestamp_column.clone(),
            });
        }
        return Ok(false);
    };
    let timestamps = to_timestamps(source)?;
    let hours = derived_column(&config.hour_column, &timestamps, PrimitiveDateTime::hour);
    let days = derived_column(&config.day_column, &timestamps, PrimitiveDateTime::day);

    table.set_column(Column::timestamp(config.timestamp_column.as_str(), timestamps))?;
    table.set_column(hours)?;
    table.set_column(days)?;
    Ok(true)
}
