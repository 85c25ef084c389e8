use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, SecondsFormat, Weekday};

use crate::model::asset::AssetType;

/// Bar width requested from `/chart/price_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartInterval {
    FiveMin,
    FifteenMin,
    #[default]
    OneHour,
    OneDay,
}

impl ChartInterval {
    pub const ALL: [ChartInterval; 4] = [
        Self::FiveMin,
        Self::FifteenMin,
        Self::OneHour,
        Self::OneDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FiveMin => "5min",
            Self::FifteenMin => "15min",
            Self::OneHour => "1hour",
            Self::OneDay => "1day",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FiveMin => "5 Minutes",
            Self::FifteenMin => "15 Minutes",
            Self::OneHour => "1 Hour",
            Self::OneDay => "1 Day",
        }
    }

    pub fn duration_ms(self) -> u64 {
        match self {
            Self::FiveMin => 5 * 60_000,
            Self::FifteenMin => 15 * 60_000,
            Self::OneHour => 3_600_000,
            Self::OneDay => 86_400_000,
        }
    }
}

impl fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown interval '{}', expected 5min/15min/1hour/1day", s))
    }
}

/// Look-back window ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    LastHour,
    Last12Hours,
    #[default]
    Last24Hours,
    Last3Days,
    Today,
    Last7Days,
    Last30Days,
}

impl TimeRange {
    pub const ALL: [TimeRange; 7] = [
        Self::LastHour,
        Self::Last12Hours,
        Self::Last24Hours,
        Self::Last3Days,
        Self::Today,
        Self::Last7Days,
        Self::Last30Days,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::Last12Hours => "12h",
            Self::Last24Hours => "24h",
            Self::Last3Days => "3d",
            Self::Today => "today",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::LastHour => "Last Hour",
            Self::Last12Hours => "Last 12 Hours",
            Self::Last24Hours => "Last 24 Hours",
            Self::Last3Days => "Last 3 Days",
            Self::Today => "Today",
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
        }
    }

    fn start_from(self, end: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            Self::LastHour => end - Duration::hours(1),
            Self::Last12Hours => end - Duration::hours(12),
            Self::Last24Hours => end - Duration::hours(24),
            Self::Last3Days => end - Duration::days(3),
            Self::Today => at_clock(end, 0, 0),
            Self::Last7Days => end - Duration::days(7),
            Self::Last30Days => end - Duration::days(30),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown range '{}', expected 1h/12h/24h/3d/today/7d/30d", s))
    }
}

/// Start and end of a chart request, in the caller's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ChartWindow {
    /// Stocks only trade on weekdays: both ends move back to the last business day,
    /// and the window is pinned to 09:30..16:30.
    pub fn compute(range: TimeRange, asset_type: AssetType, now: DateTime<FixedOffset>) -> Self {
        let end = now;
        let start = range.start_from(end);
        if asset_type != AssetType::Stock {
            return Self { start, end };
        }
        Self {
            start: at_clock(last_business_day(start), 9, 30),
            end: at_clock(last_business_day(end), 16, 30),
        }
    }

    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Millis, false)
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

fn last_business_day(mut dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    while matches!(dt.weekday(), Weekday::Sat | Weekday::Sun) {
        dt -= Duration::days(1);
    }
    dt
}

fn at_clock(dt: DateTime<FixedOffset>, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    dt.date_naive()
        .and_hms_opt(hour, minute, 0)
        .and_then(|naive| naive.and_local_timezone(*dt.offset()).single())
        .unwrap_or(dt)
}
