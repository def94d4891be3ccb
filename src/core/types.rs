use std::cmp::Ordering;
use std::fmt;
use serde::{Serialize, Deserialize};
use chrono::{Datelike, TimeZone, Utc};
use crate::core::error::{Error, ErrorKind, Result};

/// First year an essay could have been examined
pub const FOUNDING_YEAR: i32 = 1974;

/// Exam sessions run twice a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    May,
    November,
}

impl Session {
    pub fn month(self) -> u32 {
        match self {
            Session::May => 5,
            Session::November => 11,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Session::May => 'M',
            Session::November => 'N',
        }
    }

    /// Case-insensitive month name, e.g. "NOVEMBER"
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("may") {
            Some(Session::May)
        } else if token.eq_ignore_ascii_case("november") {
            Some(Session::November)
        } else {
            None
        }
    }

    fn from_month(month: u32) -> Option<Self> {
        match month {
            5 => Some(Session::May),
            11 => Some(Session::November),
            _ => None,
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'M' | 'm' => Some(Session::May),
            'N' | 'n' => Some(Session::November),
            _ => None,
        }
    }
}

/// An exam session such as "N21". Ordered by `key`, the epoch millisecond of the
/// first instant of the session's month (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    year: i32,
    session: Option<Session>,
    key: i64,
}

impl TimePeriod {
    pub const UNKNOWN: TimePeriod = TimePeriod {
        year: 1970,
        session: None,
        key: 0,
    };
    pub const UNKNOWN_DISPLAY: &'static str = "Unknown";

    pub fn new(year: i32, session: Session) -> Result<Self> {
        let current_year = Utc::now().year();
        if year < FOUNDING_YEAR || year > current_year {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Impossible year for an exam session: {}", year),
            ));
        }
        let start = Utc
            .with_ymd_and_hms(year, session.month(), 1, 0, 0, 0)
            .single()
            .ok_or_else(|| Error::new(ErrorKind::Internal, format!("No start instant for {}", year)))?;

        Ok(TimePeriod {
            year,
            session: Some(session),
            key: start.timestamp_millis(),
        })
    }

    /// Inverse of `key()`; 0 is the unknown sentinel
    pub fn from_key(key: i64) -> Result<Self> {
        if key == 0 {
            return Ok(TimePeriod::UNKNOWN);
        }
        let instant = Utc
            .timestamp_millis_opt(key)
            .single()
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, format!("Invalid period key: {}", key)))?;
        let session = Session::from_month(instant.month()).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("Invalid exam session month: {}", instant.month()),
            )
        })?;
        let period = TimePeriod::new(instant.year(), session)?;
        if period.key != key {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Period key {} is not the start of a session", key),
            ));
        }
        Ok(period)
    }

    /// Parse the short form, e.g. "M21" or "n98". Two-digit years above 50 are 19xx.
    pub fn from_display(display: &str) -> Result<Self> {
        let display = display.trim();
        if display == Self::UNKNOWN_DISPLAY {
            return Ok(TimePeriod::UNKNOWN);
        }
        let mut chars = display.chars();
        let letter = chars.next().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, "Empty exam session")
        })?;
        let session = Session::from_letter(letter).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("Invalid exam session month {}", letter),
            )
        })?;
        let digits = chars.as_str();
        let parsed: i32 = digits.parse().map_err(|_| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("Invalid exam session year {}", digits),
            )
        })?;
        let century = if parsed > 50 { 1900 } else { 2000 };
        TimePeriod::new(century + parsed, session)
    }

    pub fn year(&self) -> Option<i32> {
        self.session.map(|_| self.year)
    }

    pub fn session(&self) -> Option<Session> {
        self.session
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn is_unknown(&self) -> bool {
        self.session.is_none()
    }

    pub fn display_name(&self) -> String {
        match self.session {
            None => Self::UNKNOWN_DISPLAY.to_string(),
            Some(session) => format!("{}{:02}", session.letter(), self.year.rem_euclid(100)),
        }
    }
}

impl PartialOrd for TimePeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Decoded document: text per page, cover page first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(pages: Vec<String>) -> Self {
        Document { pages }
    }

    pub fn cover_page(&self) -> Option<&str> {
        self.pages.first().map(String::as_str)
    }

    pub fn page(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
