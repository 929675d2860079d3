//! Core data models for covidstats
//!
//! This module contains the wire representation of a monthly totals report,
//! the validated `Record` the analysis works on, and the API client that
//! fetches reports month by month.

pub mod plan;
pub mod reports;

pub use plan::{month_key, parse_month_key, FetchPlan, PlanError};
pub use reports::{ClientConfig, FetchError, MonthOutcome, ReportsClient};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One `data` object from the totals endpoint
///
/// Every field is optional on the wire. Reports are cached exactly as
/// received; validation into a [`Record`] happens when the dataset is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Day the totals were reported for
    pub date: Option<NaiveDate>,
    /// Upstream timestamp of the last update, kept verbatim
    pub last_update: Option<String>,
    pub confirmed: Option<i64>,
    pub confirmed_diff: Option<i64>,
    pub deaths: Option<i64>,
    pub deaths_diff: Option<i64>,
    pub recovered: Option<i64>,
    pub recovered_diff: Option<i64>,
    pub active: Option<i64>,
    pub active_diff: Option<i64>,
    /// Deaths over confirmed cases, as a fraction
    pub fatality_rate: Option<f64>,
}

impl Report {
    /// Returns true if the report carries no field at all
    pub fn is_empty(&self) -> bool {
        *self == Report::default()
    }

    /// Folds several per-region reports into one total
    ///
    /// Counts are summed (a field stays `None` only if it is missing from every
    /// report), the latest date wins, and the fatality rate is recomputed from
    /// the summed deaths and confirmed counts.
    pub fn merge(reports: &[Report]) -> Report {
        fn sum(reports: &[Report], field: impl Fn(&Report) -> Option<i64>) -> Option<i64> {
            reports
                .iter()
                .filter_map(&field)
                .fold(None, |acc, v| Some(acc.unwrap_or(0) + v))
        }

        let deaths = sum(reports, |r| r.deaths);
        let confirmed = sum(reports, |r| r.confirmed);
        let fatality_rate = match (deaths, confirmed) {
            (Some(d), Some(c)) if c > 0 => Some(d as f64 / c as f64),
            _ => None,
        };

        Report {
            date: reports.iter().filter_map(|r| r.date).max(),
            last_update: reports.iter().filter_map(|r| r.last_update.clone()).max(),
            confirmed,
            confirmed_diff: sum(reports, |r| r.confirmed_diff),
            deaths,
            deaths_diff: sum(reports, |r| r.deaths_diff),
            recovered: sum(reports, |r| r.recovered),
            recovered_diff: sum(reports, |r| r.recovered_diff),
            active: sum(reports, |r| r.active),
            active_diff: sum(reports, |r| r.active_diff),
            fatality_rate,
        }
    }
}

/// One month's statistics snapshot, validated and ready for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The month this record was fetched for (always the 1st)
    pub key: NaiveDate,
    /// Report date as given by the API
    pub date: NaiveDate,
    pub deaths: i64,
    pub confirmed: i64,
    pub fatality_rate: f64,
}
