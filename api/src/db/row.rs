// Typed access to Snowflake JSON result sets

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::db::error::DbError;

/// Column metadata from the `rowtype` section of a query response
#[derive(Debug, Clone, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub scale: Option<i64>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Rows of a finished statement, every cell in Snowflake's string form
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Vec<Column>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Column names are upper-cased here so lookups never depend on driver casing
    pub fn new(mut columns: Vec<Column>, rows: Vec<Vec<Option<String>>>) -> Self {
        for column in &mut columns {
            column.name = column.name.to_uppercase();
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub(crate) fn extend(&mut self, rows: Vec<Vec<Option<String>>>) {
        self.rows.extend(rows);
    }
}

/// A single row borrowed from a [`ResultSet`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [Column],
    cells: &'a [Option<String>],
}

impl<'a> Row<'a> {
    /// Reads the named column, matching names case-insensitively
    pub fn try_get<T: FromCell>(&self, name: &str) -> Result<T, DbError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DbError::decode(name, "column not present in result"))?;
        self.try_get_by_index(index)
    }

    pub fn try_get_by_index<T: FromCell>(&self, index: usize) -> Result<T, DbError> {
        let column = self
            .columns
            .get(index)
            .ok_or_else(|| DbError::decode(index.to_string(), "column index out of range"))?;
        let raw = self.cells.get(index).and_then(|c| c.as_deref());
        T::from_cell(column, raw)
    }
}

/// Conversion from a Snowflake JSON cell
pub trait FromCell: Sized {
    fn from_cell(column: &Column, raw: Option<&str>) -> Result<Self, DbError>;
}

fn required<'a>(column: &Column, raw: Option<&'a str>) -> Result<&'a str, DbError> {
    raw.ok_or_else(|| DbError::decode(&column.name, "unexpected NULL"))
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell(column: &Column, raw: Option<&str>) -> Result<Self, DbError> {
        match raw {
            None => Ok(None),
            Some(_) => T::from_cell(column, raw).map(Some),
        }
    }
}

impl FromCell for String {
    fn from_cell(column: &Column, raw: Option<&str>) -> Result<Self, DbError> {
        required(column, raw).map(str::to_string)
    }
}

impl FromCell for i64 {
    fn from_cell(column: &Column, raw: Option<&str>) -> Result<Self, DbError> {
        let raw = required(column, raw)?.trim();
        // NUMBER(38, s) sums arrive as "17" or "17.000"
        let integral = match raw.split_once('.') {
            Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
            _ => raw,
        };
        integral
            .parse::<i64>()
            .map_err(|e| DbError::decode(&column.name, format!("{:?} is not an integer: {}", raw, e)))
    }
}

impl FromCell for NaiveDateTime {
    fn from_cell(column: &Column, raw: Option<&str>) -> Result<Self, DbError> {
        let raw = required(column, raw)?.trim();
        parse_timestamp(&column.data_type, raw)
            .ok_or_else(|| DbError::decode(&column.name, format!("{:?} is not a timestamp", raw)))
    }
}

/// Parses the epoch form (`"1700000000.123456789"`, optionally followed by a
/// `TIMESTAMP_TZ` offset in minutes biased by 1440) into wall-clock time.
/// Text timestamps are accepted as well.
fn parse_timestamp(data_type: &str, raw: &str) -> Option<NaiveDateTime> {
    let mut parts = raw.split_whitespace();
    let epoch = parts.next()?;

    if let Some(utc) = parse_epoch(epoch) {
        let offset_minutes = match (data_type.eq_ignore_ascii_case("timestamp_tz"), parts.next()) {
            (true, Some(bias)) => bias.parse::<i64>().ok()?.checked_sub(1440)?,
            _ => 0,
        };
        return utc.checked_add_signed(TimeDelta::try_minutes(offset_minutes)?);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}

fn parse_epoch(epoch: &str) -> Option<NaiveDateTime> {
    let (seconds, fraction) = match epoch.split_once('.') {
        Some((s, f)) => (s, f),
        None => (epoch, ""),
    };
    if seconds.is_empty() || !seconds.trim_start_matches('-').chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut seconds: i64 = seconds.parse().ok()?;
    let mut nanos: i64 = if fraction.is_empty() {
        0
    } else {
        let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse().ok()?
    };
    // "-1.5" means 1.5 seconds before the epoch
    if epoch.starts_with('-') && nanos > 0 {
        seconds -= 1;
        nanos = 1_000_000_000 - nanos;
    }
    DateTime::from_timestamp(seconds, nanos as u32).map(|dt| dt.naive_utc())
}
