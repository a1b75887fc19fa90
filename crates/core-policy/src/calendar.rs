//! iCalendar-style validity windows
//!
//! An ACE may restrict access to recurring windows, each described by a
//! period and an optional daily recurrence rule:
//!
//! ```text
//! period     = date "/" date | date-time "/" date-time
//! date       = YYYYmmdd
//! date-time  = YYYYmmddTHHMMSS
//! recurrence = "FREQ=DAILY" [ "; UNTIL=" date ] [ "; BYDAY=" day *( "," day ) ]
//! day        = "SU" | "MO" | "TU" | "WE" | "TH" | "FR" | "SA"
//! ```
//!
//! Without a recurrence the window is every instant whose *date* lies
//! between the period's start and end dates. With a recurrence the window
//! is, on each qualifying day from the start date on, the time-of-day
//! range between the period's start and end times.
//!
//! All times are naive local wall-clock times; the clock collaborator
//! decides which zone "local" is.

use crate::error::{PolicyError, Result};
use alloc::format;
use alloc::string::ToString;
use bitflags::bitflags;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

const DATE_LEN: usize = 8;
const DATE_TIME_LEN: usize = 15;

bitflags! {
    /// Set of weekdays, Sunday first
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct Weekdays: u8 {
        /// Sunday
        const SUNDAY = 1 << 0;
        /// Monday
        const MONDAY = 1 << 1;
        /// Tuesday
        const TUESDAY = 1 << 2;
        /// Wednesday
        const WEDNESDAY = 1 << 3;
        /// Thursday
        const THURSDAY = 1 << 4;
        /// Friday
        const FRIDAY = 1 << 5;
        /// Saturday
        const SATURDAY = 1 << 6;
    }
}

impl Weekdays {
    /// Flag for one chrono weekday
    #[must_use]
    pub fn from_weekday(day: Weekday) -> Self {
        Self::from_bits_truncate(1 << day.num_days_from_sunday())
    }

    /// True if `day` is in the set
    #[must_use]
    pub fn includes(self, day: Weekday) -> bool {
        self.contains(Self::from_weekday(day))
    }

    fn from_code(code: &str) -> Option<Self> {
        let day = match code {
            "SU" => Self::SUNDAY,
            "MO" => Self::MONDAY,
            "TU" => Self::TUESDAY,
            "WE" => Self::WEDNESDAY,
            "TH" => Self::THURSDAY,
            "FR" => Self::FRIDAY,
            "SA" => Self::SATURDAY,
            _ => return None,
        };
        Some(day)
    }
}

/// Parsed period: a start and an end, both dates or both date-times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Period {
    /// Parse `start/end`
    ///
    /// # Errors
    ///
    /// `InvalidPeriod` if either half is malformed, the halves have
    /// different forms, or end is not strictly after start.
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = text
            .trim()
            .split_once('/')
            .ok_or_else(|| PolicyError::InvalidPeriod(format!("missing '/' in '{}'", text)))?;

        if start.len() != end.len() {
            return Err(PolicyError::InvalidPeriod(format!(
                "start and end of '{}' have different forms",
                text
            )));
        }

        let (start, end) = match start.len() {
            DATE_LEN => (
                parse_date(start)?.and_time(NaiveTime::MIN),
                parse_date(end)?.and_time(NaiveTime::MIN),
            ),
            DATE_TIME_LEN => (parse_date_time(start)?, parse_date_time(end)?),
            _ => {
                return Err(PolicyError::InvalidPeriod(format!(
                    "'{}' is neither YYYYmmdd nor YYYYmmddTHHMMSS",
                    start
                )))
            }
        };

        if end <= start {
            return Err(PolicyError::InvalidPeriod(format!(
                "end of '{}' is not after its start",
                text
            )));
        }

        Ok(Self { start, end })
    }

    /// Start of the period
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// End of the period
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// True if `now` falls inside the window this period describes
    ///
    /// Without a recurrence only dates are compared. With one, the time
    /// of day must lie between the start and end times on a day that is
    /// on or after the start date, on or before `UNTIL` and in `BYDAY`.
    #[must_use]
    pub fn contains(&self, recurrence: Option<&Recurrence>, now: NaiveDateTime) -> bool {
        let today = now.date();
        match recurrence {
            None => self.start.date() <= today && today <= self.end.date(),
            Some(rule) => {
                let time = now.time();
                self.start.time() <= time
                    && time <= self.end.time()
                    && self.start.date() <= today
                    && rule.until.map_or(true, |until| today <= until)
                    && rule
                        .by_day
                        .map_or(true, |days| days.includes(today.weekday()))
            }
        }
    }
}

/// Daily recurrence rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    until: Option<NaiveDate>,
    by_day: Option<Weekdays>,
}

impl Recurrence {
    /// Parse a `;`-separated rule
    ///
    /// `FREQ` is mandatory and only `DAILY` is accepted. Unknown keys and
    /// unknown weekday codes are rejected rather than ignored.
    ///
    /// # Errors
    ///
    /// `InvalidRecurrence` for any malformed or unsupported rule part.
    pub fn parse(text: &str) -> Result<Self> {
        let mut daily = false;
        let mut until = None;
        let mut by_day = None;

        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                PolicyError::InvalidRecurrence(format!("'{}' is not KEY=VALUE", part))
            })?;

            match key.trim() {
                "FREQ" => {
                    if value.trim() != "DAILY" {
                        return Err(PolicyError::InvalidRecurrence(format!(
                            "unsupported frequency '{}'",
                            value.trim()
                        )));
                    }
                    daily = true;
                }
                "UNTIL" => {
                    let value = value.trim();
                    if value.len() != DATE_LEN {
                        return Err(PolicyError::InvalidRecurrence(format!(
                            "UNTIL '{}' is not YYYYmmdd",
                            value
                        )));
                    }
                    until = Some(parse_date(value).map_err(|_| {
                        PolicyError::InvalidRecurrence(format!("invalid UNTIL date '{}'", value))
                    })?);
                }
                "BYDAY" => {
                    let mut days = Weekdays::empty();
                    for code in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                        days |= Weekdays::from_code(code).ok_or_else(|| {
                            PolicyError::InvalidRecurrence(format!("unknown weekday '{}'", code))
                        })?;
                    }
                    if days.is_empty() {
                        return Err(PolicyError::InvalidRecurrence(
                            "BYDAY lists no weekday".to_string(),
                        ));
                    }
                    by_day = Some(days);
                }
                other => {
                    return Err(PolicyError::InvalidRecurrence(format!(
                        "unsupported rule part '{}'",
                        other
                    )))
                }
            }
        }

        if !daily {
            return Err(PolicyError::InvalidRecurrence(
                "FREQ is mandatory".to_string(),
            ));
        }

        Ok(Self { until, by_day })
    }

    /// Last valid date, if bounded
    #[must_use]
    pub const fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    /// Allowed weekdays, if restricted
    #[must_use]
    pub const fn by_day(&self) -> Option<Weekdays> {
        self.by_day
    }
}

/// Evaluate one period/recurrence pair at `now`
///
/// An empty recurrence string means "period only".
///
/// # Errors
///
/// Propagates parse errors; callers deciding access treat them as "not
/// within".
pub fn is_within(period: &str, recurrence: &str, now: NaiveDateTime) -> Result<bool> {
    let period = Period::parse(period)?;
    let recurrence = if recurrence.trim().is_empty() {
        None
    } else {
        Some(Recurrence::parse(recurrence)?)
    };
    Ok(period.contains(recurrence.as_ref(), now))
}

/// Parse an exact `YYYYmmddTHHMMSS` timestamp
///
/// # Errors
///
/// `InvalidPeriod` if the text is not a valid date-time of that form.
pub fn parse_date_time(text: &str) -> Result<NaiveDateTime> {
    let bytes = text.as_bytes();
    if bytes.len() != DATE_TIME_LEN || bytes[DATE_LEN] != b'T' {
        return Err(PolicyError::InvalidPeriod(format!(
            "'{}' is not YYYYmmddTHHMMSS",
            text
        )));
    }
    let date = parse_date(&text[..DATE_LEN])?;
    let hour = digits(text, DATE_LEN + 1, 2)?;
    let minute = digits(text, DATE_LEN + 3, 2)?;
    let second = digits(text, DATE_LEN + 5, 2)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| PolicyError::InvalidPeriod(format!("'{}' has an invalid time", text)))?;
    Ok(date.and_time(time))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    if text.len() != DATE_LEN {
        return Err(PolicyError::InvalidPeriod(format!(
            "'{}' is not YYYYmmdd",
            text
        )));
    }
    let year = digits(text, 0, 4)?;
    let month = digits(text, 4, 2)?;
    let day = digits(text, 6, 2)?;
    let year = i32::try_from(year)
        .map_err(|_| PolicyError::InvalidPeriod(format!("year out of range in '{}'", text)))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PolicyError::InvalidPeriod(format!("'{}' is not a calendar date", text)))
}

fn digits(text: &str, offset: usize, len: usize) -> Result<u32> {
    let field = text
        .get(offset..offset + len)
        .filter(|f| f.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| PolicyError::InvalidPeriod(format!("expected digits in '{}'", text)))?;
    field
        .parse()
        .map_err(|_| PolicyError::InvalidPeriod(format!("expected digits in '{}'", text)))
}
