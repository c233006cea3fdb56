use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ServiceError;

const MINUTES_PER_DAY: u16 = 24 * 60;

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2}):(\d{2})\s?([AaPp][Mm])\s*$").expect("clock time pattern is valid")
    })
}

/// Wall-clock time of day in the "hh:mm AM/PM" notation used by schedules.
///
/// Stored as minutes since midnight, so ordering and arithmetic are plain
/// integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);
    pub const NOON: ClockTime = ClockTime(12 * 60);

    /// Compile-time constructor for literal times; panics on an invalid reading.
    pub const fn at(hour: u16, minute: u16) -> Self {
        assert!(hour < 24 && minute < 60, "invalid clock reading");
        Self(hour * 60 + minute)
    }

    /// Build from a 24-hour clock reading.
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        let invalid = || ServiceError::validation(format!("Invalid time '{}', expected hh:mm AM/PM", value));

        let captures = clock_pattern().captures(value).ok_or_else(invalid)?;
        let hour: u16 = captures[1].parse().map_err(|_| invalid())?;
        let minute: u16 = captures[2].parse().map_err(|_| invalid())?;

        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(invalid());
        }

        let is_pm = captures[3].eq_ignore_ascii_case("pm");
        let hour24 = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };

        Ok(Self(hour24 * 60 + minute))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// `None` when the result would run past the end of the day.
    pub fn add_minutes(&self, minutes: u16) -> Option<Self> {
        self.0.checked_add(minutes).and_then(Self::from_minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour12, suffix) = match self.hour() {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        write!(f, "{:02}:{:02} {}", hour12, self.minute(), suffix)
    }
}

impl FromStr for ClockTime {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
