//! Cell values to SQL literals.
//!
//! The coercions cover every column type the workbook can hold, including
//! yes/no text (`boolean`) that no current sheet column is typed as.

use std::fmt;

use calamine::Data;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// SQL literals
// ---------------------------------------------------------------------------

/// A normalized cell, ready to be written into an insert statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Number(f64),
    Integer(i64),
    TextArray(Vec<String>),
}

impl SqlValue {
    /// Empty tag sets become NULL rather than an empty array literal.
    pub fn text_array<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            SqlValue::Null
        } else {
            SqlValue::TextArray(tags)
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Text(s) => f.write_str(&quote(s)),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Date(d) => write!(f, "'{}'", d.format("%Y-%m-%d")),
            SqlValue::Number(n) if n.is_finite() => write!(f, "{n}"),
            SqlValue::Number(_) => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{i}"),
            SqlValue::TextArray(tags) => {
                let items: Vec<String> = tags.iter().map(|t| quote(t)).collect();
                write!(f, "ARRAY[{}]::text[]", items.join(", "))
            }
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Text)
    }
}

impl From<Option<&str>> for SqlValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string()))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Bool)
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Date)
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(n) if n.is_finite() => SqlValue::Number(n),
            _ => SqlValue::Null,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(SqlValue::Null, SqlValue::Integer)
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Which side wins when free-text dates like `01/02/2026` are ambiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

impl DateOrder {
    fn formats(self) -> &'static [&'static str] {
        match self {
            DateOrder::DayFirst => &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"],
            DateOrder::MonthFirst => &["%Y-%m-%d", "%m-%d-%Y", "%m/%d/%Y", "%d/%m/%Y"],
        }
    }
}

const EXTRA_DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];
const EXTRA_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Serial of 9999-12-31, the last date Excel can display.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const NULL_WORDS: &[&str] = &["nan", "nat", "none"];
const TRUE_WORDS: &[&str] = &["true", "1", "yes", "si", "sì"];
const FALSE_WORDS: &[&str] = &["false", "0", "no"];

/// Serials outside Excel's date range (or not finite) have no date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// The trimmed text of a cell as a spreadsheet user would read it.
/// Empty and error cells have no text.
pub fn display_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            Some(s.trim().to_string())
        }
        Data::Float(n) => Some(format_float(*n)),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => {
            excel_serial_to_date(dt.as_f64()).map(|d| d.format("%Y-%m-%d").to_string())
        }
    }
}

/// True for cells with nothing in them at all. Formula errors such as
/// `#N/A` count as blank.
pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

pub fn text(cell: &Data) -> Option<String> {
    display_text(cell).filter(|s| !s.is_empty() && !NULL_WORDS.contains(&s.to_lowercase().as_str()))
}

#[allow(dead_code)]
pub fn boolean(cell: &Data) -> Option<bool> {
    if let Data::Bool(b) = cell {
        return Some(*b);
    }
    let s = display_text(cell)?.to_lowercase();
    if TRUE_WORDS.contains(&s.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&s.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_date_text(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let raw = raw.trim();
    order
        .formats()
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

pub fn date(cell: &Data, order: DateOrder) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.get(..10).and_then(|d| parse_date_text(d, DateOrder::DayFirst)),
        Data::String(s) => parse_date_text(s, order),
        _ => None,
    }
}

/// [`date`] plus the human-formatted layouts found in exported reports
/// ("March 5, 2026", "2026-03-05 10:00:00").
pub fn date_loose(cell: &Data, order: DateOrder) -> Option<NaiveDate> {
    if let Some(d) = date(cell, order) {
        return Some(d);
    }
    let Data::String(s) = cell else {
        return None;
    };
    let s = s.trim();
    EXTRA_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            EXTRA_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn number(cell: &Data) -> Option<f64> {
    let n = match cell {
        Data::Float(n) => *n,
        Data::Int(i) => *i as f64,
        Data::Bool(b) => f64::from(u8::from(*b)),
        Data::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn integer(cell: &Data) -> Option<i64> {
    number(cell).map(|n| n.trunc() as i64)
}

/// "ACME LLC - Jane Doe" -> "Jane Doe"
pub fn extract_contact_name(display_name: &str) -> Option<String> {
    display_name
        .split_once(" - ")
        .map(|(_, person)| person.trim().to_string())
        .filter(|p| !p.is_empty())
}
