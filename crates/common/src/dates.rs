//! Lenient date conversion.
//!
//! Dates reach ausdex as calendar dates, as years (`2006`, `2006.5`) or as
//! free text typed on the command line ("March 1991", "4 October 1977",
//! "06-06-1949"). Everything is normalised to a [`NaiveDate`] before any
//! lookup happens.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt;
use thiserror::Error;

/// Failure to turn an input into a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The text does not look like any supported date layout
    #[error("Could not understand '{0}' as a date")]
    Unparseable(String),
    /// The fields were understood but do not form a valid date
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

/// Anything that can be converted into a date.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    /// A calendar date, used as is
    Date(NaiveDate),
    /// A whole year, meaning the 1st of January
    Year(i32),
    /// A year with a fractional part giving the elapsed share of the year
    DecimalYear(f64),
    /// Free text to parse
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(datetime: NaiveDateTime) -> Self {
        DateInput::Date(datetime.date())
    }
}

impl From<i32> for DateInput {
    fn from(year: i32) -> Self {
        DateInput::Year(year)
    }
}

impl From<f64> for DateInput {
    fn from(year: f64) -> Self {
        DateInput::DecimalYear(year)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

impl From<&String> for DateInput {
    fn from(text: &String) -> Self {
        DateInput::Text(text.clone())
    }
}

impl fmt::Display for DateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateInput::Date(date) => write!(f, "{date}"),
            DateInput::Year(year) => write!(f, "{year}"),
            DateInput::DecimalYear(year) => write!(f, "{year}"),
            DateInput::Text(text) => f.write_str(text),
        }
    }
}

impl DateInput {
    /// Resolve to a calendar date.
    pub fn to_date(&self) -> Result<NaiveDate, DateError> {
        match self {
            DateInput::Date(date) => Ok(*date),
            DateInput::Year(year) => NaiveDate::from_ymd_opt(*year, 1, 1)
                .ok_or_else(|| DateError::OutOfRange(year.to_string())),
            DateInput::DecimalYear(year) => from_decimal_year(*year),
            DateInput::Text(text) => parse_text(text),
        }
    }
}

/// Convert any supported input into a calendar date.
///
/// Whole years map to the 1st of January and decimal years add the elapsed
/// share of the year in whole days, so `2006.5` is `2006-07-02`.
pub fn convert_date(input: impl Into<DateInput>) -> Result<NaiveDate, DateError> {
    input.into().to_date()
}

/// Express a date as a decimal year, e.g. 1 July 2006 is about `2006.4959`.
pub fn to_decimal_year(date: NaiveDate) -> f64 {
    let days = days_in_year(date.year());
    f64::from(date.year()) + f64::from(date.ordinal0()) / f64::from(days)
}

/// Express any supported input as a decimal year.
///
/// Numeric inputs (including numeric text) are taken as they are.
pub fn decimal_year(input: impl Into<DateInput>) -> Result<f64, DateError> {
    match input.into() {
        DateInput::Year(year) => Ok(f64::from(year)),
        DateInput::DecimalYear(year) => Ok(year),
        DateInput::Date(date) => Ok(to_decimal_year(date)),
        DateInput::Text(text) => match text.trim().parse::<f64>() {
            Ok(year) if year.is_finite() => Ok(year),
            _ => parse_text(&text).map(to_decimal_year),
        },
    }
}

fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

fn from_decimal_year(year: f64) -> Result<NaiveDate, DateError> {
    if !year.is_finite() || year.abs() > 100_000.0 {
        return Err(DateError::OutOfRange(year.to_string()));
    }
    let whole = year.floor();
    let start = NaiveDate::from_ymd_opt(whole as i32, 1, 1)
        .ok_or_else(|| DateError::OutOfRange(year.to_string()))?;
    let offset = ((year - whole) * f64::from(days_in_year(whole as i32))).floor() as i64;
    start
        .checked_add_signed(TimeDelta::days(offset))
        .ok_or_else(|| DateError::OutOfRange(year.to_string()))
}

const FILLER_WORDS: [&str; 4] = ["of", "the", "on", "at"];

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Month number for a full or abbreviated (at least three letters) month name.
fn month_from_word(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    let word = if word == "sept" { "sep" } else { word };
    MONTHS
        .iter()
        .position(|month| month.starts_with(word))
        .map(|index| index as u32 + 1)
}

fn is_weekday(word: &str) -> bool {
    word.len() >= 3 && WEEKDAYS.iter().any(|day| day.starts_with(word))
}

/// Numeric field of a date string with the number of digits it was written with.
#[derive(Debug, Clone, Copy)]
struct Field {
    value: u32,
    digits: usize,
}

impl Field {
    fn is_year(self) -> bool {
        self.digits >= 3 || self.value > 31
    }

    fn as_year(self) -> i32 {
        let value = self.value as i32;
        if self.digits > 2 {
            value
        } else if value > 50 {
            1900 + value
        } else {
            2000 + value
        }
    }
}

/// A time of day such as `10:30`, `10:30:00` or `9:15pm`.
fn is_clock_time(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    let clock = lower
        .strip_suffix("am")
        .or_else(|| lower.strip_suffix("pm"))
        .unwrap_or(&lower);
    let parts: Vec<&str> = clock.split(':').collect();
    (2..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|part| (1..=2).contains(&part.len()) && part.chars().all(|c| c.is_ascii_digit()))
}

/// Whitespace separated words of `text` with any time of day left out.
fn date_words(text: &str) -> impl Iterator<Item = &str> {
    let mut after_clock = false;
    text.split_whitespace().filter(move |word| {
        let word = word.trim_end_matches(',');
        if is_clock_time(word) {
            after_clock = true;
            return false;
        }
        let meridiem = after_clock
            && (word.eq_ignore_ascii_case("am") || word.eq_ignore_ascii_case("pm"));
        after_clock = false;
        !meridiem
    })
}

fn parse_text(text: &str) -> Result<NaiveDate, DateError> {
    let trimmed = text.trim();
    let unparseable = || DateError::Unparseable(trimmed.to_string());
    if trimmed.is_empty() {
        return Err(unparseable());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive());
    }

    // Bare years, whole or fractional
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = trimmed.parse().map_err(|_| unparseable())?;
        return DateInput::Year(year).to_date();
    }
    if let Ok(year) = trimmed.parse::<f64>() {
        return from_decimal_year(year);
    }

    let mut month_word = None;
    let mut fields = Vec::new();
    for token in date_words(trimmed)
        .flat_map(|word| word.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|token| !token.is_empty())
    {
        let lower = token.to_ascii_lowercase();
        let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            if let Some(month) = month_from_word(&lower) {
                if month_word.replace(month).is_some() {
                    return Err(unparseable());
                }
            } else if !(is_weekday(&lower) || FILLER_WORDS.contains(&lower.as_str())) {
                return Err(unparseable());
            }
            continue;
        }

        // Ordinal suffixes such as "1st" or "23rd"
        let suffix = &lower[digits.len()..];
        if !matches!(suffix, "" | "st" | "nd" | "rd" | "th") {
            return Err(unparseable());
        }
        let value = digits.parse::<u32>().map_err(|_| unparseable())?;
        fields.push(Field {
            value,
            digits: digits.len(),
        });
    }

    let (year, month, day) = match (month_word, fields.as_slice()) {
        (Some(month), [year]) => (year.as_year(), month, 1),
        (Some(month), [first, second]) => {
            if first.is_year() && !second.is_year() {
                (first.as_year(), month, second.value)
            } else {
                (second.as_year(), month, first.value)
            }
        }
        (None, [first, second]) if first.digits == 4 => (first.as_year(), second.value, 1),
        (None, [first, second]) if second.digits == 4 => (second.as_year(), first.value, 1),
        (None, [first, second, third]) if first.digits == 4 => {
            (first.as_year(), second.value, third.value)
        }
        (None, [first, second, third]) if first.value > 12 => {
            (third.as_year(), second.value, first.value)
        }
        (None, [first, second, third]) => (third.as_year(), first.value, second.value),
        _ => return Err(unparseable()),
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateError::OutOfRange(trimmed.to_string()))
}
