//! Calendar month selected on the dashboard.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike as _, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// English month names, indexed by `month - 1`.
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Earliest representable year.
const MIN_YEAR: i32 = 1;
/// Latest year that still formats as four digits.
const MAX_YEAR: i32 = 9999;

/// A calendar year + month pair.
///
/// Equality is field-wise; changing the active period invalidates all
/// period-scoped data. Serialized as the `YYYY-MM` string the backend
/// expects in its `month` query parameter.
///
/// # Examples
///
/// ```
/// use spender_rs::models::Period;
///
/// let period: Period = "2025-03".parse().unwrap();
/// assert_eq!(period.year(), 2025);
/// assert_eq!(period.month(), 3);
/// assert_eq!(period.to_string(), "2025-03");
/// assert_eq!(period.label(), "March 2025");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    /// Calendar year.
    year: i32,
    /// Month number, 1 through 12.
    month: u32,
}

impl Period {
    /// Creates a period, rejecting months outside `1..=12` and years
    /// outside `1..=9999`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMonth`] or
    /// [`ValidationError::InvalidYear`] for out-of-range values.
    #[inline]
    pub const fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if year < MIN_YEAR || year > MAX_YEAR {
            return Err(ValidationError::InvalidYear(year));
        }
        if month >= 1 && month <= 12 {
            Ok(Self { year, month })
        } else {
            Err(ValidationError::InvalidMonth(month))
        }
    }

    /// Returns the period containing today's local date.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Returns the period containing `date`.
    ///
    /// Years outside `1..=9999` are clamped to the nearest bound.
    #[inline]
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(MIN_YEAR, MAX_YEAR),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[inline]
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number (1–12).
    #[inline]
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// First day of the month, or `None` if the year is outside
    /// chrono's supported range.
    #[inline]
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Returns `true` if `date` falls inside this month.
    #[inline]
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The following month; December 9999 has none and returns itself.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            if self.year >= MAX_YEAR {
                return self;
            }
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month; January of year 1 has none and returns itself.
    #[inline]
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            if self.year <= MIN_YEAR {
                return self;
            }
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Human-readable label such as `"March 2025"`.
    #[inline]
    #[must_use]
    pub fn label(self) -> String {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("?");
        format!("{name} {}", self.year)
    }
}

impl fmt::Display for Period {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPeriod(s.to_owned());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_err| invalid())?;
        let month = month.parse::<u32>().map_err(|_err| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = ValidationError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    #[inline]
    fn from(period: Period) -> Self {
        period.to_string()
    }
}
