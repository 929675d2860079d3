//! UI rendering module for covidstats
//!
//! This module contains the rendering logic for the terminal chart viewer,
//! using the ratatui library for TUI components.

pub mod buckets;
pub mod chart;
pub mod help_overlay;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};

/// Renders the whole screen for the current application state
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let selected = View::ALL.iter().position(|v| *v == app.view).unwrap_or(0);
    let tabs = Tabs::new(View::ALL.iter().map(|v| v.title()).collect::<Vec<_>>())
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunks[0]);

    match app.view.metric() {
        Some(metric) => chart::render(frame, chunks[1], &app.dataset, metric),
        None => buckets::render(frame, chunks[1], &app.dataset, app.scroll),
    }

    let footer = Line::from(vec![
        Span::styled(app.status.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled("  Tab: view  ?: help  q: quit", Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(footer), chunks[2]);

    if app.show_help {
        help_overlay::render(frame);
    }
}
