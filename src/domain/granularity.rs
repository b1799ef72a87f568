// Aggregation granularity and calendar bucketing
use super::error::ChartError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    #[default]
    None,
    Hour,
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn is_bucketed(self) -> bool {
        self != Granularity::None
    }

    /// Start of the bucket containing `time_ms`, in epoch milliseconds (UTC).
    ///
    /// Weeks start on Sunday. `None` is the identity.
    pub fn bucket_start_ms(self, time_ms: i64) -> i64 {
        if self == Granularity::None {
            return time_ms;
        }
        match DateTime::<Utc>::from_timestamp_millis(time_ms) {
            Some(time) => self.bucket_start(time).and_utc().timestamp_millis(),
            None => time_ms,
        }
    }

    fn bucket_start(self, time: DateTime<Utc>) -> NaiveDateTime {
        let naive = time.naive_utc();
        let date = naive.date();
        match self {
            Granularity::None => naive,
            Granularity::Hour => midnight(date) + Duration::hours(i64::from(naive.hour())),
            Granularity::Day => midnight(date),
            Granularity::Week => {
                let offset = i64::from(date.weekday().num_days_from_sunday());
                midnight(date - Duration::days(offset))
            }
            Granularity::Month => midnight(date.with_day(1).unwrap_or(date)),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

impl FromStr for Granularity {
    type Err = ChartError;

    /// Accepts full names and the single-letter codes (`h`, `d`, `w`, `m`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "raw" => Ok(Granularity::None),
            "h" | "hour" | "hourly" => Ok(Granularity::Hour),
            "d" | "day" | "daily" => Ok(Granularity::Day),
            "w" | "week" | "weekly" => Ok(Granularity::Week),
            "m" | "month" | "monthly" => Ok(Granularity::Month),
            _ => Err(ChartError::UnsupportedGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::None => "none",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };
        f.write_str(name)
    }
}
