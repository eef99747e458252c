use crate::errors::Error;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

/// Named lookback used to bound a record query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    SevenDays,
    ThirtyDays,
    SixMonths,
    OneYear,
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::SevenDays,
        TimeWindow::ThirtyDays,
        TimeWindow::SixMonths,
        TimeWindow::OneYear,
        TimeWindow::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::SevenDays => "7d",
            TimeWindow::ThirtyDays => "30d",
            TimeWindow::SixMonths => "6m",
            TimeWindow::OneYear => "1y",
            TimeWindow::All => "all",
        }
    }

    /// `None` means unbounded.
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            TimeWindow::SevenDays => Some(Duration::days(7)),
            TimeWindow::ThirtyDays => Some(Duration::days(30)),
            TimeWindow::SixMonths => Some(Duration::days(180)),
            TimeWindow::OneYear => Some(Duration::days(365)),
            TimeWindow::All => None,
        }
    }

    /// Earliest `recorded_at` included in the window, relative to `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lookback().map(|lookback| now - lookback)
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid filter '{}', expected one of 7d, 30d, 6m, 1y, all",
                    s
                ))
            })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
