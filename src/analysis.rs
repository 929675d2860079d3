//! Dataset assembly and fatality-rate bucketing
//!
//! Turns cached reports back into validated records, sorts them by date,
//! derives year and month, and assigns each row a fatality bucket from
//! percentile thresholds computed over the whole dataset.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use log::warn;

use crate::cache::{CacheError, CacheManager};
use crate::data::{parse_month_key, Record, Report};

/// Percentiles used as bucket edges, lowest to highest
pub const BUCKET_PERCENTILES: [f64; 6] = [0.0, 1.0, 24.0, 76.0, 99.0, 100.0];

/// Added above the observed maximum when choosing a y-axis limit
pub const Y_HEADROOM: i64 = 100_000;

/// Why a cached entry did not make it into the dataset
#[derive(Debug, Clone, PartialEq)]
pub enum RowIssue {
    /// Key is not a `YYYY-MM-DD` date
    BadKey,
    /// Key was listed but no entry could be read back
    CacheMiss,
    /// Entry exists but is not a valid report
    Corrupt(String),
    /// A required field is absent from the report
    MissingField(&'static str),
    /// Fatality rate is outside [0, 1]
    RateOutOfRange(f64),
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::BadKey => write!(f, "key is not a date"),
            RowIssue::CacheMiss => write!(f, "cache miss"),
            RowIssue::Corrupt(reason) => write!(f, "corrupt entry: {}", reason),
            RowIssue::MissingField(field) => write!(f, "missing field '{}'", field),
            RowIssue::RateOutOfRange(rate) => write!(f, "fatality rate {} outside [0, 1]", rate),
        }
    }
}

/// A cache entry that was left out, and why
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub key: String,
    pub issue: RowIssue,
}

impl Record {
    /// Validates a cached report for the month `key`
    pub fn from_report(key: NaiveDate, report: &Report) -> Result<Record, RowIssue> {
        let deaths = report.deaths.ok_or(RowIssue::MissingField("deaths"))?;
        let confirmed = report.confirmed.ok_or(RowIssue::MissingField("confirmed"))?;
        let fatality_rate = report
            .fatality_rate
            .ok_or(RowIssue::MissingField("fatality_rate"))?;
        let date = report.date.ok_or(RowIssue::MissingField("date"))?;

        if !(0.0..=1.0).contains(&fatality_rate) {
            return Err(RowIssue::RateOutOfRange(fatality_rate));
        }

        Ok(Record {
            key,
            date,
            deaths,
            confirmed,
            fatality_rate,
        })
    }
}

/// Records read back from the cache plus everything that was skipped
#[derive(Debug, Default)]
pub struct Reloaded {
    pub records: Vec<Record>,
    pub rejected: Vec<Rejected>,
}

/// Reads every listed key back from the cache and validates it
///
/// Per-entry problems become [`Rejected`] rows; only filesystem failures
/// abort the reload.
pub fn reload_records(cache: &CacheManager, keys: &[String]) -> Result<Reloaded, CacheError> {
    let mut reloaded = Reloaded::default();

    for key in keys {
        let outcome = match parse_month_key(key) {
            None => Err(RowIssue::BadKey),
            Some(month) => match cache.get::<Report>(key) {
                Ok(Some(report)) => Record::from_report(month, &report),
                Ok(None) => Err(RowIssue::CacheMiss),
                Err(CacheError::Corrupt { source, .. }) => Err(RowIssue::Corrupt(source.to_string())),
                Err(e) => return Err(e),
            },
        };

        match outcome {
            Ok(record) => reloaded.records.push(record),
            Err(issue) => {
                warn!("Skipping cached entry {}: {}", key, issue);
                reloaded.rejected.push(Rejected {
                    key: key.clone(),
                    issue,
                });
            }
        }
    }

    Ok(reloaded)
}

/// Ordered fatality-rate category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FatalityBucket {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl FatalityBucket {
    pub const ALL: [FatalityBucket; 5] = [
        FatalityBucket::VeryLow,
        FatalityBucket::Low,
        FatalityBucket::Medium,
        FatalityBucket::High,
        FatalityBucket::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FatalityBucket::VeryLow => "Very Low",
            FatalityBucket::Low => "Low",
            FatalityBucket::Medium => "Medium",
            FatalityBucket::High => "High",
            FatalityBucket::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for FatalityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Percentile of an ascending slice, linearly interpolated between closest ranks
///
/// `p` is in percent. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Fatality rate with four decimals, as shown in tables
pub fn format_rate(rate: f64) -> String {
    format!("{:.4}", rate)
}

/// Bucket edges computed over one dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    edges: [f64; 6],
}

impl Thresholds {
    /// Computes the edges at [`BUCKET_PERCENTILES`]; `None` if `values` is empty
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut edges = [0.0; 6];
        for (edge, p) in edges.iter_mut().zip(BUCKET_PERCENTILES) {
            *edge = percentile(&sorted, p)?;
        }
        Some(Self { edges })
    }

    pub fn edges(&self) -> &[f64; 6] {
        &self.edges
    }

    /// Bucket for `value`
    ///
    /// Buckets are right-open `[edge_i, edge_i+1)`; the top bucket also takes
    /// the maximum. Values below the minimum land in the lowest bucket.
    pub fn bucket(&self, value: f64) -> FatalityBucket {
        let index = self.edges[1..5].iter().filter(|edge| value >= **edge).count();
        FatalityBucket::ALL[index]
    }

    /// Lower and upper edge of `bucket`
    pub fn range(&self, bucket: FatalityBucket) -> (f64, f64) {
        let i = bucket as usize;
        (self.edges[i], self.edges[i + 1])
    }
}

/// A dataset row with its derived fields
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub record: Record,
    pub year: i32,
    pub month: u32,
    pub bucket: FatalityBucket,
}

/// Which count a chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Deaths,
    Confirmed,
}

impl Metric {
    pub fn value(&self, record: &Record) -> i64 {
        match self {
            Metric::Deaths => record.deaths,
            Metric::Confirmed => record.confirmed,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::Deaths => "Covid Deaths Over Time",
            Metric::Confirmed => "Covid Cases Over Time",
        }
    }

    pub fn axis_label(&self) -> &'static str {
        match self {
            Metric::Deaths => "Deaths",
            Metric::Confirmed => "Cases",
        }
    }
}

/// All records of one analysis run, sorted by date
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    thresholds: Option<Thresholds>,
}

impl Dataset {
    /// Sorts records by report date (then month key), derives year and month,
    /// and buckets every fatality rate against thresholds of this set
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.key.cmp(&b.key)));

        let rates: Vec<f64> = records.iter().map(|r| r.fatality_rate).collect();
        let thresholds = Thresholds::compute(&rates);

        let rows = match thresholds {
            Some(ref t) => records
                .into_iter()
                .map(|record| Row {
                    year: record.date.year(),
                    month: record.date.month(),
                    bucket: t.bucket(record.fatality_rate),
                    record,
                })
                .collect(),
            None => Vec::new(),
        };

        Self { rows, thresholds }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn thresholds(&self) -> Option<&Thresholds> {
        self.thresholds.as_ref()
    }

    /// `(date, value)` points in date order
    pub fn series(&self, metric: Metric) -> Vec<(NaiveDate, i64)> {
        self.rows
            .iter()
            .map(|row| (row.record.date, metric.value(&row.record)))
            .collect()
    }

    /// Upper y-axis limit: observed maximum plus [`Y_HEADROOM`]
    pub fn y_limit(&self, metric: Metric) -> Option<i64> {
        self.rows
            .iter()
            .map(|row| metric.value(&row.record))
            .max()
            .map(|max| max.saturating_add(Y_HEADROOM))
    }

    /// Earliest and latest report dates
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.record.date, self.rows.last()?.record.date))
    }

    /// Number of rows per bucket, in bucket order
    pub fn bucket_counts(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for row in &self.rows {
            counts[row.bucket as usize] += 1;
        }
        counts
    }
}
