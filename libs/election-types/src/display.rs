//! Display-time conversion and formatting.
//!
//! Instants arrive from the service in UTC and are shown to voters in a fixed
//! display zone (East Africa Time, UTC+3, unless configured otherwise).
//! Conversion changes the offset, never the instant.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{
    format_description::FormatItem,
    macros::{format_description, offset},
    Duration, OffsetDateTime, UtcOffset,
};

/// East Africa Time.
pub const EAST_AFRICA_TIME: UtcOffset = offset!(+3);

const ABSOLUTE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[month repr:long] [day padding:none], [year], [hour repr:12]:[minute] [period]"
);

const OFFSET_FORMAT: &[FormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// The fixed offset instants are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayZone {
    offset: UtcOffset,
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::new(EAST_AFRICA_TIME)
    }
}

impl DisplayZone {
    pub const fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// The same instant expressed in the display offset. `None` stays `None`.
    pub fn to_display_time(&self, instant: Option<OffsetDateTime>) -> Option<OffsetDateTime> {
        instant.map(|instant| instant.to_offset(self.offset))
    }

    /// Long-form date and time in the display offset, e.g.
    /// `March 1, 2025, 08:00 AM (UTC+03:00)`, or `N/A` when there is no
    /// instant to show.
    pub fn format_absolute(&self, instant: Option<OffsetDateTime>) -> String {
        let Some(local) = self.to_display_time(instant) else {
            return "N/A".to_owned();
        };

        match local.format(ABSOLUTE_FORMAT) {
            Ok(formatted) => format!("{formatted} ({self})"),
            Err(_) => local.to_string(),
        }
    }
}

impl Display for DisplayZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset.is_utc() {
            return f.write_str("UTC");
        }
        match self.offset.format(OFFSET_FORMAT) {
            Ok(offset) => write!(f, "UTC{offset}"),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid display offset {0:?}; expected e.g. \"+03:00\"")]
pub struct InvalidDisplayZone(String);

impl FromStr for DisplayZone {
    type Err = InvalidDisplayZone;

    /// Accepts `+03:00`, `-05:30`, `UTC+03:00`, `Z` and `UTC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let offset = trimmed.strip_prefix("UTC").unwrap_or(trimmed);
        if offset.is_empty() || offset == "Z" {
            return Ok(Self::new(UtcOffset::UTC));
        }
        UtcOffset::parse(offset, OFFSET_FORMAT)
            .map(Self::new)
            .map_err(|_| InvalidDisplayZone(s.to_owned()))
    }
}

/// Renders a duration as its largest nonzero unit down to seconds, e.g.
/// `1d 2h 3m 4s`, `2h 0m 5s`, `1m 30s` or `0s`.
pub fn format_duration(total_seconds: u64) -> String {
    let days = total_seconds / SECONDS_PER_DAY;
    let hours = (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total_seconds % SECONDS_PER_MINUTE;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Message shown once the countdown target has passed.
pub const ENDED_MESSAGE: &str = "Election ended";

/// Breakdown of the time left until a target instant. Recomputed on every
/// countdown tick and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub ended: bool,
    pub total_seconds: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub message: String,
}

impl TimeRemaining {
    pub fn ended() -> Self {
        Self {
            ended: true,
            total_seconds: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            message: ENDED_MESSAGE.to_owned(),
        }
    }

    /// Time left from `now` until `target`. Ended once `target <= now`.
    pub fn until(target: OffsetDateTime, now: OffsetDateTime) -> Self {
        Self::from_duration(target - now)
    }

    pub fn from_duration(remaining: Duration) -> Self {
        if remaining <= Duration::ZERO {
            return Self::ended();
        }

        let total_seconds = remaining.whole_seconds().unsigned_abs();
        Self {
            ended: false,
            total_seconds,
            days: total_seconds / SECONDS_PER_DAY,
            hours: (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            minutes: (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total_seconds % SECONDS_PER_MINUTE,
            message: format_duration(total_seconds),
        }
    }
}
