//! Application state for the chart viewer
//!
//! Holds the analyzed dataset and tracks which view is shown, the scroll
//! position of the bucket table, and whether the help overlay is open.

use crossterm::event::{KeyCode, KeyEvent};

use crate::analysis::{Dataset, Metric};

/// The views the viewer can cycle through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Deaths,
    Cases,
    Buckets,
}

impl View {
    pub const ALL: [View; 3] = [View::Deaths, View::Cases, View::Buckets];

    pub fn title(&self) -> &'static str {
        match self {
            View::Deaths => "Deaths",
            View::Cases => "Cases",
            View::Buckets => "Buckets",
        }
    }

    /// Metric plotted by this view, if it is a chart
    pub fn metric(&self) -> Option<Metric> {
        match self {
            View::Deaths => Some(Metric::Deaths),
            View::Cases => Some(Metric::Confirmed),
            View::Buckets => None,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    fn next(&self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }

    fn previous(&self) -> View {
        View::ALL[(self.index() + View::ALL.len() - 1) % View::ALL.len()]
    }
}

/// Main application struct managing state and data
pub struct App {
    /// Rows and thresholds of this run
    pub dataset: Dataset,
    /// Currently shown view
    pub view: View,
    /// First visible row of the bucket table
    pub scroll: usize,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// One-line run summary shown in the footer
    pub status: String,
}

impl App {
    pub fn new(dataset: Dataset, status: impl Into<String>) -> Self {
        Self {
            dataset,
            view: View::Deaths,
            scroll: 0,
            show_help: false,
            should_quit: false,
            status: status.into(),
        }
    }

    /// Handles a single key press
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.view = self.view.next(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.view = self.view.previous()
            }
            KeyCode::Char('1') => self.view = View::Deaths,
            KeyCode::Char('2') => self.view = View::Cases,
            KeyCode::Char('3') => self.view = View::Buckets,
            KeyCode::Down | KeyCode::Char('j') if self.view == View::Buckets => self.scroll_down(),
            KeyCode::Up | KeyCode::Char('k') if self.view == View::Buckets => self.scroll_up(),
            KeyCode::Char('g') if self.view == View::Buckets => self.scroll = 0,
            KeyCode::Char('G') if self.view == View::Buckets => self.scroll = self.max_scroll(),
            _ => {}
        }
    }

    fn max_scroll(&self) -> usize {
        self.dataset.len().saturating_sub(1)
    }

    fn scroll_down(&mut self) {
        if self.scroll < self.max_scroll() {
            self.scroll += 1;
        }
    }

    fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}
