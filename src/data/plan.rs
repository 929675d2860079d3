//! Which months to fetch
//!
//! A `FetchPlan` is an inclusive range of years crossed with an inclusive
//! window of months, walked year-major. The default reproduces the classic
//! 2020-2023 coverage with December left out of every year.

use chrono::{Datelike, NaiveDate};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Format of a month key, also the `date` query parameter
const KEY_FORMAT: &str = "%Y-%m-%d";

/// Errors for plans that cannot be walked
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Start year {start} is after end year {end}")]
    EmptyYears { start: i32, end: i32 },

    #[error("Month {0} is outside 1-12")]
    InvalidMonth(u32),

    #[error("First month {first} is after last month {last}")]
    EmptyMonths { first: u32, last: u32 },

    #[error("Year {0} cannot be represented as a date")]
    UnrepresentableYear(i32),
}

/// Inclusive year range × inclusive month window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    years: RangeInclusive<i32>,
    months: RangeInclusive<u32>,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self {
            years: 2020..=2023,
            months: 1..=11,
        }
    }
}

impl FetchPlan {
    /// Builds a plan, rejecting empty ranges and months outside 1-12
    pub fn new(years: RangeInclusive<i32>, months: RangeInclusive<u32>) -> Result<Self, PlanError> {
        let (start, end) = (*years.start(), *years.end());
        let (first, last) = (*months.start(), *months.end());

        if start > end {
            return Err(PlanError::EmptyYears { start, end });
        }
        for month in [first, last] {
            if !(1..=12).contains(&month) {
                return Err(PlanError::InvalidMonth(month));
            }
        }
        if first > last {
            return Err(PlanError::EmptyMonths { first, last });
        }
        for year in [start, end] {
            if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                return Err(PlanError::UnrepresentableYear(year));
            }
        }

        Ok(Self { years, months })
    }

    pub fn years(&self) -> &RangeInclusive<i32> {
        &self.years
    }

    pub fn months(&self) -> &RangeInclusive<u32> {
        &self.months
    }

    /// First day of every planned month, year outer and month inner
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.years.clone().flat_map(move |year| {
            self.months
                .clone()
                .filter_map(move |month| NaiveDate::from_ymd_opt(year, month, 1))
        })
    }

    /// Number of months the plan covers
    pub fn len(&self) -> usize {
        self.dates().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `date` falls in a planned month
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.years.contains(&date.year()) && self.months.contains(&date.month())
    }
}

/// Cache key and query value for a month, e.g. `2021-03-01`
pub fn month_key(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

/// Parses a key produced by [`month_key`]
pub fn parse_month_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, KEY_FORMAT).ok()
}
