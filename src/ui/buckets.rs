//! Fatality-rate bucket view
//!
//! Shows the thresholds computed for this run, how many months fell into each
//! bucket, and a scrollable table of every month.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::analysis::{format_rate, Dataset, FatalityBucket};

/// Renders thresholds and the month table, skipping `scroll` rows
pub fn render(frame: &mut Frame, area: Rect, dataset: &Dataset, scroll: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(3)])
        .split(area);

    render_thresholds(frame, chunks[0], dataset);
    render_table(frame, chunks[1], dataset, scroll);
}

fn render_thresholds(frame: &mut Frame, area: Rect, dataset: &Dataset) {
    let block = Block::default()
        .title(" Fatality Rate Buckets ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let lines: Vec<Line> = match dataset.thresholds() {
        None => vec![Line::from(Span::styled(
            "No data cached yet",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(thresholds) => {
            let counts = dataset.bucket_counts();
            FatalityBucket::ALL
                .iter()
                .map(|bucket| {
                    let (lo, hi) = thresholds.range(*bucket);
                    let close = if *bucket == FatalityBucket::VeryHigh { ']' } else { ')' };
                    Line::from(vec![
                        Span::styled(format!("  {:<10}", bucket.label()), bucket_style(*bucket)),
                        Span::raw(format!(
                            "[{}, {}{}  {} months",
                            format_rate(lo),
                            format_rate(hi),
                            close,
                            counts[*bucket as usize]
                        )),
                    ])
                })
                .collect()
        }
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_table(frame: &mut Frame, area: Rect, dataset: &Dataset, scroll: usize) {
    let header = Row::new(["Month", "Report date", "Deaths", "Cases", "Rate", "Bucket"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .skip(scroll)
        .map(|row| {
            Row::new(vec![
                Cell::from(format!("{}-{:02}", row.year, row.month)),
                Cell::from(row.record.date.to_string()),
                Cell::from(row.record.deaths.to_string()),
                Cell::from(row.record.confirmed.to_string()),
                Cell::from(format_rate(row.record.fatality_rate)),
                Cell::from(row.bucket.label()).style(bucket_style(row.bucket)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(format!(" Months ({}) ", dataset.len()))
            .borders(Borders::ALL),
    );

    frame.render_widget(table, area);
}

fn bucket_style(bucket: FatalityBucket) -> Style {
    let color = match bucket {
        FatalityBucket::VeryLow => Color::Green,
        FatalityBucket::Low => Color::LightGreen,
        FatalityBucket::Medium => Color::Yellow,
        FatalityBucket::High => Color::LightRed,
        FatalityBucket::VeryHigh => Color::Red,
    };
    Style::default().fg(color)
}
