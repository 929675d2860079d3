//! covidstats - fetch, cache and chart monthly COVID-19 totals
//!
//! Runs the fetch → cache → analyze pipeline once, then either prints a text
//! report or opens a terminal viewer with the deaths and cases charts and the
//! fatality-rate buckets.

use std::io;
use std::panic;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};

use covidstats::app::App;
use covidstats::cache::CacheManager;
use covidstats::cli::{Cli, CliError, OutputMode, StartupConfig};
use covidstats::data::ReportsClient;
use covidstats::pipeline::{self, PipelineError, RunOutput};
use covidstats::{report, ui};

/// Sets up a panic hook that restores the terminal before printing the panic message.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Runs the pipeline with the configured source, or offline
async fn run_pipeline(config: &StartupConfig, cache: &CacheManager) -> Result<RunOutput, PipelineError> {
    match &config.client {
        Some(client_config) => {
            let client = ReportsClient::new(client_config.clone())?;
            let (years, months) = (config.plan.years(), config.plan.months());
            info!(
                "Fetching {} months ({}-{}, months {}-{}) from {}",
                config.plan.len(),
                years.start(),
                years.end(),
                months.start(),
                months.end(),
                client_config.api_url
            );
            pipeline::run(Some(&client), &config.plan, config.request_delay, cache).await
        }
        None => {
            info!("Offline: analyzing cache only");
            pipeline::run::<ReportsClient>(None, &config.plan, config.request_delay, cache).await
        }
    }
}

/// Shows the chart viewer until the user quits
fn run_viewer(mut app: App) -> io::Result<()> {
    setup_panic_hook();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| -> io::Result<()> {
        loop {
            terminal.draw(|f| ui::render(f, &app))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        app.handle_key(key);
                    }
                }
            }

            if app.should_quit {
                return Ok(());
            }
        }
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

/// Validates arguments, runs the pipeline and presents the result
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;

    let cache = match &config.cache_dir {
        Some(dir) => CacheManager::with_dir(dir.clone()),
        None => CacheManager::new().ok_or(CliError::NoCacheDir)?,
    };
    info!("Using cache at {}", cache.dir().display());

    let output = run_pipeline(&config, &cache).await?;

    match config.output {
        OutputMode::Report => print!("{}", report::render(&output)),
        OutputMode::Charts => {
            let status = report::status_line(&output);
            run_viewer(App::new(output.analysis.dataset, status))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
