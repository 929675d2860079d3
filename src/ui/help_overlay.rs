//! Key help modal, drawn over whichever view is active

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Key bindings grouped by what they act on
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Views",
        &[
            ("Tab, →/l", "Next view"),
            ("⇧Tab, ←/h", "Previous view"),
            ("1 / 2 / 3", "Deaths / Cases / Buckets"),
        ],
    ),
    (
        "Bucket table",
        &[("↑/k, ↓/j", "Scroll months"), ("g / G", "Top / bottom")],
    ),
    ("Other", &[("?", "Toggle this help"), ("q, Esc", "Quit")]),
];

const WIDTH: u16 = 50;

pub fn render(frame: &mut Frame) {
    let lines = help_lines();
    // Borders take one row above and one below
    let area = centered(frame.area(), WIDTH, lines.len() as u16 + 2);

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn help_lines() -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::styled("Keyboard Shortcuts", bold.fg(Color::Cyan))];

    for (title, keys) in SECTIONS {
        lines.push(Line::default());
        lines.push(Line::styled(*title, bold));
        for (key, action) in *keys {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ]));
        }
    }

    lines.push(Line::default());
    lines.push(Line::styled(
        "Press Esc or ? to close",
        Style::default().fg(Color::DarkGray),
    ));
    lines
}

/// `width` × `height` rect in the middle of `area`, clipped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    rect
}
