use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The first year a [`YearMonth`] can be in
pub const MIN_YEAR: i32 = 1;
/// The last year a [`YearMonth`] can be in
pub const MAX_YEAR: i32 = 9999;

/// A month of the (proleptic) Gregorian calendar, written `YYYY-MM`.
///
/// Years are limited to `MIN_YEAR..=MAX_YEAR`, so that the days that surround a month in a grid are always representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    /// 1 to 12
    month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is not in `1..=12`, or when `year` is out of the supported range
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if year < MIN_YEAR || year > MAX_YEAR || month < 1 || month > 12 {
            return None;
        }
        Some(Self { year, month })
    }

    /// The month `date` belongs to. Dates out of the supported years give the first or the last supported month
    pub fn of(date: NaiveDate) -> Self {
        if date.year() < MIN_YEAR {
            Self { year: MIN_YEAR, month: 1 }
        } else if date.year() > MAX_YEAR {
            Self { year: MAX_YEAR, month: 12 }
        } else {
            Self { year: date.year(), month: date.month() }
        }
    }

    /// The current month, in local time
    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    pub fn year(&self) -> i32   { self.year }
    pub fn month(&self) -> u32  { self.month }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap(/* checked when this value was built */)
    }

    pub fn last_day(&self) -> NaiveDate {
        match self.month {
            12 => NaiveDate::from_ymd_opt(self.year, 12, 31),
            m => NaiveDate::from_ymd_opt(self.year, m + 1, 1).and_then(|first| first.pred_opt()),
        }.unwrap(/* checked when this value was built */)
    }

    /// 28 to 31
    pub fn num_days(&self) -> u32 {
        self.last_day().day()
    }

    /// The previous month. The first supported month is its own predecessor
    pub fn prev(&self) -> Self {
        match (self.year, self.month) {
            (MIN_YEAR, 1) => *self,
            (year, 1) => Self { year: year - 1, month: 12 },
            (year, m) => Self { year, month: m - 1 },
        }
    }

    /// The next month. The last supported month is its own successor
    pub fn next(&self) -> Self {
        match (self.year, self.month) {
            (MAX_YEAR, 12) => *self,
            (year, 12) => Self { year: year + 1, month: 1 },
            (year, m) => Self { year, month: m + 1 },
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The first and the last instant of this month, used to fetch the tasks displayed in a month view
    pub fn date_time_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.first_day().and_hms_opt(0, 0, 0).unwrap(/* valid time */);
        let end = self.last_day().and_hms_opt(23, 59, 59).unwrap(/* valid time */);
        (start, end)
    }

    /// A human-readable title, e.g. `February 2024`
    pub fn title(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = match s.trim().rsplit_once('-') {
            None => return Err(format!("Invalid month {:?}, expected YYYY-MM", s)),
            Some(parts) => parts,
        };
        let year: i32 = year.parse().map_err(|err| format!("Invalid year in {:?}: {}", s, err))?;
        let month: u32 = month.parse().map_err(|err| format!("Invalid month in {:?}: {}", s, err))?;
        Self::new(year, month).ok_or_else(|| format!("Month out of range: {:?}", s))
    }
}

/// Used to support serde
impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<YearMonth, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
