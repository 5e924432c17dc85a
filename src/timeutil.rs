use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A clock time within a single day, stored as minutes since midnight.
///
/// Serializes as a 24-hour "HH:MM" string, which is the wire format every
/// schedule boundary uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

#[derive(Debug, Clone)]
pub struct TimeParseError {
    input: String,
}

impl TimeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day '{}' (expected HH:MM)", self.input)
    }
}

impl std::error::Error for TimeParseError {}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self(hours * 60 + minutes))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Shift by a signed number of minutes, failing when the result leaves
    /// the day.
    pub fn offset(self, delta_minutes: i32) -> Option<Self> {
        let shifted = self.0 as i32 + delta_minutes;
        if (0..MINUTES_PER_DAY as i32).contains(&shifted) {
            Some(Self(shifted as u16))
        } else {
            None
        }
    }

    /// Minutes from this time to `other` (negative when `other` is earlier).
    pub fn minutes_until(self, other: TimeOfDay) -> i32 {
        other.0 as i32 - self.0 as i32
    }

    /// The clock time of a UTC instant, discarding the date.
    pub fn from_datetime(datetime: &DateTime<Utc>) -> Self {
        Self((datetime.hour() * 60 + datetime.minute()) as u16)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hours, minutes) = s.split_once(':').ok_or_else(|| TimeParseError::new(s))?;
        let hours: u16 = hours.trim().parse().map_err(|_| TimeParseError::new(s))?;
        let minutes: u16 = minutes.trim().parse().map_err(|_| TimeParseError::new(s))?;
        Self::from_hm(hours, minutes).ok_or_else(|| TimeParseError::new(s))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err: TimeParseError| {
            D::Error::custom(err.to_string())
        })
    }
}

/// Compose a day and a clock time into a UTC instant.
///
/// The hosting app owns real timezone conversion; the engine treats the
/// local clock time as UTC so that composition and decomposition stay
/// symmetric with [`TimeOfDay::from_datetime`].
pub fn compose_utc(date: NaiveDate, time: TimeOfDay) -> DateTime<Utc> {
    let clock = NaiveTime::from_num_seconds_from_midnight_opt(time.minutes() as u32 * 60, 0)
        .expect("TimeOfDay is always a valid clock time");
    date.and_time(clock).and_utc()
}
