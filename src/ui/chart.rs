//! Time-series line chart for deaths or confirmed cases
//!
//! The y-axis runs from zero to the observed maximum plus a fixed headroom and
//! is labelled with plain integers.

use chrono::{Datelike, NaiveDate};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::analysis::{self, Metric};

/// Days of padding either side when every point shares one date
const SINGLE_POINT_PADDING_DAYS: f64 = 15.0;

/// Number of labels along the y-axis
const Y_LABELS: usize = 5;

/// Renders the chart for `metric` into `area`
pub fn render(frame: &mut Frame, area: Rect, dataset: &analysis::Dataset, metric: Metric) {
    let block = Block::default()
        .title(format!(" {} ", metric.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let (Some((first, last)), Some(y_max)) = (dataset.date_span(), dataset.y_limit(metric)) else {
        let empty = Paragraph::new("No data cached yet")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let points: Vec<(f64, f64)> = dataset
        .series(metric)
        .into_iter()
        .map(|(date, value)| (day_number(date), value as f64))
        .collect();

    let (mut x_min, mut x_max) = (day_number(first), day_number(last));
    if x_min == x_max {
        x_min -= SINGLE_POINT_PADDING_DAYS;
        x_max += SINGLE_POINT_PADDING_DAYS;
    }

    let series = Dataset::default()
        .name(metric.axis_label())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(&points);

    let markers = Dataset::default()
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::White))
        .data(&points);

    let axis_style = Style::default().fg(Color::Gray);
    let chart = Chart::new(vec![series, markers])
        .block(block)
        .x_axis(
            Axis::default()
                .title("Date")
                .style(axis_style)
                .bounds([x_min, x_max])
                .labels(date_labels(first, last)),
        )
        .y_axis(
            Axis::default()
                .title(metric.axis_label())
                .style(axis_style)
                .bounds([0.0, y_max as f64])
                .labels(
                    count_labels(y_max)
                        .into_iter()
                        .map(|label| Span::styled(label, Style::default().add_modifier(Modifier::BOLD)))
                        .collect::<Vec<_>>(),
                ),
        );

    frame.render_widget(chart, area);
}

/// Position of a date on the x-axis
fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// First, middle and last month of the span
fn date_labels(first: NaiveDate, last: NaiveDate) -> Vec<Span<'static>> {
    let middle = first + (last - first) / 2;
    [first, middle, last]
        .iter()
        .map(|date| Span::raw(date.format("%Y-%m").to_string()))
        .collect()
}

/// Evenly spaced plain-integer labels from zero to `max`
pub fn count_labels(max: i64) -> Vec<String> {
    (0..Y_LABELS)
        .map(|i| {
            let value = max as i128 * i as i128 / (Y_LABELS as i128 - 1);
            value.to_string()
        })
        .collect()
}
