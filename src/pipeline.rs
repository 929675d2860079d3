//! The fetch → filter → cache → reload → analyze pipeline
//!
//! Each stage takes the previous stage's output and returns its own; nothing
//! is shared between stages except the cache directory itself.

use std::time::Duration;

use chrono::NaiveDate;
use log::{info, warn};
use thiserror::Error;

use crate::analysis::{reload_records, Dataset, Rejected};
use crate::cache::{CacheError, CacheManager};
use crate::data::{month_key, FetchError, FetchPlan, MonthOutcome, Report, ReportsClient};

/// Errors that stop the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Could not create HTTP client: {0}")]
    Client(#[from] FetchError),
}

/// Anything that can produce a month's report
#[allow(async_fn_in_trait)]
pub trait ReportSource {
    async fn fetch_report(&self, date: NaiveDate) -> MonthOutcome;
}

impl ReportSource for ReportsClient {
    async fn fetch_report(&self, date: NaiveDate) -> MonthOutcome {
        ReportsClient::fetch_report(self, date).await
    }
}

/// Outcome of one planned month
#[derive(Debug)]
pub struct FetchedMonth {
    pub date: NaiveDate,
    pub outcome: MonthOutcome,
}

/// Per-cause tally of a fetch run
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub fetched: Vec<NaiveDate>,
    pub empty: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, FetchError)>,
}

/// Requests every planned month in order, one at a time
///
/// `delay` is slept between consecutive requests.
pub async fn fetch_all<S: ReportSource>(
    source: &S,
    plan: &FetchPlan,
    delay: Duration,
) -> Vec<FetchedMonth> {
    let mut months = Vec::with_capacity(plan.len());

    for (i, date) in plan.dates().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        info!("Fetching {}", month_key(date));
        let outcome = source.fetch_report(date).await;
        months.push(FetchedMonth { date, outcome });
    }

    months
}

/// Keeps the months that carried a report and tallies the rest by cause
pub fn retain_reports(months: Vec<FetchedMonth>) -> (Vec<(NaiveDate, Report)>, FetchSummary) {
    let mut reports = Vec::new();
    let mut summary = FetchSummary::default();

    for FetchedMonth { date, outcome } in months {
        match outcome {
            MonthOutcome::Fetched(report) => {
                summary.fetched.push(date);
                reports.push((date, report));
            }
            MonthOutcome::EmptyPayload => {
                warn!("{}: empty payload, not cached", month_key(date));
                summary.empty.push(date);
            }
            MonthOutcome::Failed(e) => {
                warn!("{}: fetch failed: {}", month_key(date), e);
                summary.failed.push((date, e));
            }
        }
    }

    info!(
        "Fetched {} months ({} empty, {} failed)",
        summary.fetched.len(),
        summary.empty.len(),
        summary.failed.len()
    );

    (reports, summary)
}

/// Writes each report under its month key
pub fn store_reports(
    cache: &CacheManager,
    reports: &[(NaiveDate, Report)],
) -> Result<usize, CacheError> {
    for (date, report) in reports {
        cache.put(&month_key(*date), report)?;
    }
    info!("Cached {} reports in {}", reports.len(), cache.dir().display());
    Ok(reports.len())
}

/// Dataset built from the cache, plus whatever was skipped on the way
#[derive(Debug)]
pub struct Analysis {
    pub dataset: Dataset,
    pub rejected: Vec<Rejected>,
}

/// Reloads every cached key and builds the dataset
pub fn analyze(cache: &CacheManager) -> Result<Analysis, CacheError> {
    let keys = cache.keys()?;
    let reloaded = reload_records(cache, &keys)?;

    if !reloaded.rejected.is_empty() {
        info!("Skipped {} cached entries", reloaded.rejected.len());
    }

    let dataset = Dataset::from_records(reloaded.records);
    info!("Dataset holds {} months", dataset.len());

    Ok(Analysis {
        dataset,
        rejected: reloaded.rejected,
    })
}

/// Everything a full run produced
#[derive(Debug)]
pub struct RunOutput {
    /// `None` when fetching was skipped
    pub fetch: Option<FetchSummary>,
    pub analysis: Analysis,
}

/// Runs all stages; with `source = None` only the cache is analyzed
pub async fn run<S: ReportSource>(
    source: Option<&S>,
    plan: &FetchPlan,
    delay: Duration,
    cache: &CacheManager,
) -> Result<RunOutput, PipelineError> {
    let fetch = match source {
        Some(source) => {
            let months = fetch_all(source, plan, delay).await;
            let (reports, summary) = retain_reports(months);
            store_reports(cache, &reports)?;
            Some(summary)
        }
        None => None,
    };

    let analysis = analyze(cache)?;

    Ok(RunOutput { fetch, analysis })
}
