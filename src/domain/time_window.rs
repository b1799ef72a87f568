// Inclusive query window derived from calendar dates
use super::error::ChartError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window from two date-like inputs.
    ///
    /// Only the calendar date of each input is kept: `start` becomes midnight of its
    /// date and `end` becomes 23:59:59 of its date, whatever time component was given.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, ChartError> {
        let start_date = parse_calendar_date(start)?;
        let end_date = parse_calendar_date(end)?;
        Self::from_calendar_dates(start_date, end_date)
    }

    pub fn from_calendar_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, ChartError> {
        if start > end {
            return Err(ChartError::InvalidRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let midnight = NaiveTime::from_hms_opt(0, 0, 0);
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59);
        match (midnight, end_of_day) {
            (Some(midnight), Some(end_of_day)) => Ok(Self {
                start: start.and_time(midnight).and_utc(),
                end: end.and_time(end_of_day).and_utc(),
            }),
            _ => Err(ChartError::InvalidRange("invalid time of day".to_string())),
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Both bounds are inclusive
    pub fn contains_ms(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms() && time_ms <= self.end_ms()
    }
}

fn parse_calendar_date(input: &str) -> Result<NaiveDate, ChartError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    // Keep the calendar date as written, not shifted into UTC
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }

    Err(ChartError::InvalidRange(format!(
        "could not parse '{}' as a date",
        input
    )))
}
