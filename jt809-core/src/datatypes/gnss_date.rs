//! GNSS date/time fields carried in location sub-packets

use crate::error::{Jt809Error, Jt809Result};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// GNSS date, encoded as day, month and a big-endian 2-byte year
///
/// The year 2009 is transmitted as `0x07 0xD9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnssDate {
    day: u8,
    month: u8,
    year: u16,
}

impl GnssDate {
    pub const LENGTH: usize = 4;

    /// Constructs a GNSS date
    ///
    /// # Errors
    ///
    /// Returns an error if month or day are out of range
    pub fn new(year: u16, month: u8, day: u8) -> Jt809Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Jt809Error::InvalidData(format!(
                "Parameter month is out of range, got {}",
                month
            )));
        }
        if !(1..=31).contains(&day) {
            return Err(Jt809Error::InvalidData(format!(
                "Parameter day of month is out of range, got {}",
                day
            )));
        }
        Ok(Self { day, month, year })
    }

    /// Build from any chrono date-like value
    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            day: date.day() as u8,
            month: date.month() as u8,
            year: date.year() as u16,
        }
    }

    /// Today's date from the local wall clock
    pub fn today() -> Self {
        Self::from_date(&Local::now())
    }

    /// Decode from the 4-byte wire form
    ///
    /// No range check is applied so that a peer's odd clock never fails a
    /// whole frame.
    pub fn decode(bytes: &[u8]) -> Jt809Result<Self> {
        if bytes.len() != Self::LENGTH {
            return Err(Jt809Error::InvalidData(format!(
                "Wrong GNSS date size. Expected {}, got {}",
                Self::LENGTH,
                bytes.len()
            )));
        }
        Ok(Self {
            day: bytes[0],
            month: bytes[1],
            year: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }

    pub fn encode(&self) -> [u8; 4] {
        let year = self.year.to_be_bytes();
        [self.day, self.month, year[0], year[1]]
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// Convert to a calendar date, `None` if the fields do not form one
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }
}

impl Default for GnssDate {
    fn default() -> Self {
        Self {
            day: 1,
            month: 1,
            year: 1970,
        }
    }
}

impl fmt::Display for GnssDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// GNSS time of day, encoded as hour, minute, second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GnssTime {
    hour: u8,
    minute: u8,
    second: u8,
}

impl GnssTime {
    pub const LENGTH: usize = 3;

    pub fn new(hour: u8, minute: u8, second: u8) -> Jt809Result<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(Jt809Error::InvalidData(format!(
                "Time out of range: {:02}:{:02}:{:02}",
                hour, minute, second
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
        }
    }

    pub fn now() -> Self {
        Self::from_time(&Local::now())
    }

    pub fn decode(bytes: &[u8]) -> Jt809Result<Self> {
        if bytes.len() != Self::LENGTH {
            return Err(Jt809Error::InvalidData(format!(
                "Wrong GNSS time size. Expected {}, got {}",
                Self::LENGTH,
                bytes.len()
            )));
        }
        Ok(Self {
            hour: bytes[0],
            minute: bytes[1],
            second: bytes[2],
        })
    }

    pub fn encode(&self) -> [u8; 3] {
        [self.hour, self.minute, self.second]
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
    }
}

impl fmt::Display for GnssTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Split a timestamp into the two wire fields
pub fn gnss_date_time(at: &NaiveDateTime) -> (GnssDate, GnssTime) {
    (GnssDate::from_date(at), GnssTime::from_time(at))
}
