//! Plain-text summary of a run, for `--report`

use std::fmt::Write;

use crate::analysis::{format_rate, Dataset, FatalityBucket, Metric};
use crate::pipeline::RunOutput;

/// One-line summary of what a run fetched and kept
pub fn status_line(output: &RunOutput) -> String {
    let kept = output.analysis.dataset.len();
    let skipped = output.analysis.rejected.len();
    match &output.fetch {
        Some(fetch) => format!(
            "fetched {} / empty {} / failed {} · {} months cached ({} skipped)",
            fetch.fetched.len(),
            fetch.empty.len(),
            fetch.failed.len(),
            kept,
            skipped
        ),
        None => format!("offline · {} months cached ({} skipped)", kept, skipped),
    }
}

/// Renders the dataset as a table followed by thresholds and plot limits
pub fn render(output: &RunOutput) -> String {
    let dataset = &output.analysis.dataset;
    let mut out = String::new();

    let _ = writeln!(out, "{}", status_line(output));
    if let Some(fetch) = &output.fetch {
        for (date, err) in &fetch.failed {
            let _ = writeln!(out, "  failed  {}: {}", date, err);
        }
    }
    for rejected in &output.analysis.rejected {
        let _ = writeln!(out, "  skipped {}: {}", rejected.key, rejected.issue);
    }
    let _ = writeln!(out);

    if dataset.is_empty() {
        let _ = writeln!(out, "No data cached yet");
        return out;
    }

    write_rows(&mut out, dataset);
    let _ = writeln!(out);
    write_thresholds(&mut out, dataset);
    let _ = writeln!(out);
    for metric in [Metric::Deaths, Metric::Confirmed] {
        if let Some(limit) = dataset.y_limit(metric) {
            let _ = writeln!(out, "{} y-limit: 0..{}", metric.axis_label(), limit);
        }
    }

    out
}

fn write_rows(out: &mut String, dataset: &Dataset) {
    let _ = writeln!(
        out,
        "{:<8} {:<11} {:>12} {:>14} {:>8}  {}",
        "Month", "Date", "Deaths", "Cases", "Rate", "Bucket"
    );
    for row in dataset.rows() {
        let _ = writeln!(
            out,
            "{:<8} {:<11} {:>12} {:>14} {:>8}  {}",
            format!("{}-{:02}", row.year, row.month),
            row.record.date,
            row.record.deaths,
            row.record.confirmed,
            format_rate(row.record.fatality_rate),
            row.bucket
        );
    }
}

fn write_thresholds(out: &mut String, dataset: &Dataset) {
    let Some(thresholds) = dataset.thresholds() else {
        return;
    };
    let counts = dataset.bucket_counts();
    let _ = writeln!(out, "Fatality rate buckets:");
    for bucket in FatalityBucket::ALL {
        let (lo, hi) = thresholds.range(bucket);
        let _ = writeln!(
            out,
            "  {:<10} [{}, {}{}  {}",
            bucket.label(),
            format_rate(lo),
            format_rate(hi),
            if bucket == FatalityBucket::VeryHigh { ']' } else { ')' },
            counts[bucket as usize]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Rejected, RowIssue};
    use crate::data::{FetchError, Record};
    use crate::pipeline::{Analysis, FetchSummary};
    use chrono::NaiveDate;
    use reqwest::StatusCode;

    fn date(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, 1).unwrap()
    }

    fn output(fetch: Option<FetchSummary>) -> RunOutput {
        let records = [(1, 100), (2, 200), (3, 150)]
            .into_iter()
            .map(|(m, deaths)| Record {
                key: date(m),
                date: date(m),
                deaths,
                confirmed: deaths * 30,
                fatality_rate: deaths as f64 / 10_000.0,
            })
            .collect();

        RunOutput {
            fetch,
            analysis: Analysis {
                dataset: Dataset::from_records(records),
                rejected: vec![Rejected {
                    key: "2021-04-01".to_string(),
                    issue: RowIssue::MissingField("deaths"),
                }],
            },
        }
    }

    #[test]
    fn test_status_line_offline() {
        assert_eq!(
            status_line(&output(None)),
            "offline · 3 months cached (1 skipped)"
        );
    }

    #[test]
    fn test_status_line_counts_fetch_outcomes() {
        let fetch = FetchSummary {
            fetched: vec![date(1), date(2), date(3)],
            empty: vec![date(5)],
            failed: vec![(date(7), FetchError::Status(StatusCode::NOT_FOUND))],
        };

        let line = status_line(&output(Some(fetch)));

        assert!(line.starts_with("fetched 3 / empty 1 / failed 1"));
    }

    #[test]
    fn test_render_lists_rows_in_date_order_with_limits() {
        let text = render(&output(None));

        let jan = text.find("2021-01 ").unwrap();
        let feb = text.find("2021-02 ").unwrap();
        let mar = text.find("2021-03 ").unwrap();
        assert!(jan < feb && feb < mar);
        assert!(text.contains("Deaths y-limit: 0..200100"));
        assert!(text.contains("Cases y-limit: 0..106000"));
        assert!(text.contains("skipped 2021-04-01: missing field 'deaths'"));
        assert!(text.contains("Very High"));
    }

    #[test]
    fn test_render_reports_failures() {
        let fetch = FetchSummary {
            failed: vec![(date(7), FetchError::Status(StatusCode::NOT_FOUND))],
            ..Default::default()
        };

        let text = render(&output(Some(fetch)));

        assert!(text.contains("failed  2021-07-01"));
        assert!(text.contains("404"));
    }

    #[test]
    fn test_render_empty_dataset() {
        let empty = RunOutput {
            fetch: None,
            analysis: Analysis {
                dataset: Dataset::default(),
                rejected: Vec::new(),
            },
        };

        assert!(render(&empty).contains("No data cached yet"));
    }
}
