//! Command-line interface parsing for covidstats
//!
//! This module handles parsing of CLI arguments using clap. Credentials and
//! endpoints can come from flags, the environment, or a `.env` file; they are
//! never compiled in. Parsed arguments are validated into a `StartupConfig`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::reports::{DEFAULT_API_HOST, DEFAULT_API_URL};
use crate::data::{ClientConfig, FetchPlan, PlanError};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Fetching needs an API key
    #[error("No API key given. Pass --api-key, set COVIDSTATS_API_KEY, or use --offline")]
    MissingApiKey,

    /// Year/month options do not form a usable range
    #[error("Invalid date range: {0}")]
    InvalidPlan(#[from] PlanError),

    /// No cache directory given and none could be derived
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// covidstats - fetch, cache and chart monthly COVID-19 totals
#[derive(Parser, Debug)]
#[command(name = "covidstats")]
#[command(about = "Fetch monthly COVID-19 totals, cache them, and chart deaths, cases and fatality-rate buckets")]
#[command(version)]
pub struct Cli {
    /// Totals endpoint
    #[arg(long, env = "COVIDSTATS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// RapidAPI key sent as X-RapidAPI-Key
    #[arg(long, env = "COVIDSTATS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Value sent as X-RapidAPI-Host
    #[arg(long, env = "COVIDSTATS_API_HOST", default_value = DEFAULT_API_HOST)]
    pub api_host: String,

    /// Directory holding cached reports (defaults to the platform cache dir)
    #[arg(long, env = "COVIDSTATS_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// First year to fetch (inclusive)
    #[arg(long, default_value_t = 2020)]
    pub start_year: i32,

    /// Last year to fetch (inclusive)
    #[arg(long, default_value_t = 2023)]
    pub end_year: i32,

    /// First month of each year to fetch (inclusive, 1-12)
    #[arg(long, default_value_t = 1)]
    pub first_month: u32,

    /// Last month of each year to fetch (inclusive, 1-12)
    ///
    /// Defaults to 11, matching the historical coverage that skipped December.
    #[arg(long, default_value_t = 11)]
    pub last_month: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, value_name = "SECS")]
    pub timeout_secs: u64,

    /// Extra attempts after a timeout, 429 or 5xx
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Pause between month requests in milliseconds
    #[arg(long, default_value_t = 0, value_name = "MS")]
    pub request_delay_ms: u64,

    /// Skip fetching and analyze whatever is already cached
    #[arg(long)]
    pub offline: bool,

    /// Print a text report instead of opening the chart viewer
    #[arg(long)]
    pub report: bool,
}

/// How the output should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Interactive terminal charts
    #[default]
    Charts,
    /// Plain text table on stdout
    Report,
}

/// Validated configuration for a run
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// API client settings; `None` when running offline
    pub client: Option<ClientConfig>,
    pub plan: FetchPlan,
    pub request_delay: Duration,
    /// Explicit cache directory, if one was given
    pub cache_dir: Option<PathBuf>,
    pub output: OutputMode,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if the range is invalid or an API key is required but missing
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let plan = FetchPlan::new(
            cli.start_year..=cli.end_year,
            cli.first_month..=cli.last_month,
        )?;

        let client = if cli.offline {
            None
        } else {
            let api_key = cli
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .ok_or(CliError::MissingApiKey)?;

            Some(ClientConfig {
                api_url: cli.api_url.clone(),
                api_key: api_key.to_string(),
                api_host: cli.api_host.clone(),
                timeout: Duration::from_secs(cli.timeout_secs),
                retries: cli.retries,
                ..ClientConfig::default()
            })
        };

        Ok(StartupConfig {
            client,
            plan,
            request_delay: Duration::from_millis(cli.request_delay_ms),
            cache_dir: cli.cache_dir.clone(),
            output: if cli.report {
                OutputMode::Report
            } else {
                OutputMode::Charts
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parses with an explicit key and every `env` fallback switched off, so
    /// exported `COVIDSTATS_*` variables can't leak into the defaults
    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["covidstats", "--api-key", "k"];
        argv.extend_from_slice(args);
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .get_matches_from(argv);
        Cli::from_arg_matches(&matches).expect("Arguments should map onto Cli")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);

        assert_eq!(cli.api_url, DEFAULT_API_URL);
        assert_eq!(cli.api_host, DEFAULT_API_HOST);
        assert_eq!((cli.start_year, cli.end_year), (2020, 2023));
        assert_eq!((cli.first_month, cli.last_month), (1, 11));
        assert!(!cli.offline);
        assert!(!cli.report);
    }

    #[test]
    fn test_startup_config_from_defaults() {
        let config = StartupConfig::from_cli(&parse(&[])).unwrap();
        let client = config.client.expect("Online run should have a client");

        assert_eq!(client.api_key, "k");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.retries, 2);
        assert_eq!(config.plan, FetchPlan::default());
        assert_eq!(config.request_delay, Duration::ZERO);
        assert_eq!(config.output, OutputMode::Charts);
        assert_eq!(config.cache_dir, None);
    }

    #[test]
    fn test_parse_helper_ignores_exported_variables() {
        // No other test in this crate reads these through clap's env lookup
        std::env::set_var("COVIDSTATS_API_URL", "http://localhost:9/exported");
        std::env::set_var("COVIDSTATS_CACHE_DIR", "/tmp/exported-cache");

        let cli = parse(&[]);

        assert_eq!(cli.api_url, DEFAULT_API_URL);
        assert!(cli.cache_dir.is_none());
    }

    #[test]
    fn test_custom_range_and_tuning() {
        let cli = parse(&[
            "--start-year",
            "2021",
            "--end-year",
            "2022",
            "--last-month",
            "12",
            "--timeout-secs",
            "5",
            "--request-delay-ms",
            "250",
            "--report",
        ]);

        let config = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(config.plan.len(), 24);
        assert_eq!(config.client.unwrap().timeout, Duration::from_secs(5));
        assert_eq!(config.request_delay, Duration::from_millis(250));
        assert_eq!(config.output, OutputMode::Report);
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let cli = Cli {
            api_key: None,
            ..parse(&[])
        };

        let err = StartupConfig::from_cli(&cli).unwrap_err();

        assert!(matches!(err, CliError::MissingApiKey));
        assert!(err.to_string().contains("COVIDSTATS_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let cli = Cli {
            api_key: Some("   ".to_string()),
            ..parse(&[])
        };

        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::MissingApiKey)
        ));
    }

    #[test]
    fn test_offline_needs_no_key() {
        let cli = Cli {
            api_key: None,
            ..parse(&["--offline"])
        };

        let config = StartupConfig::from_cli(&cli).unwrap();

        assert!(config.client.is_none());
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let cli = parse(&["--first-month", "0"]);

        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidPlan(PlanError::InvalidMonth(0)))
        ));
    }

    #[test]
    fn test_cache_dir_flag() {
        let cli = parse(&["--cache-dir", "/tmp/covid-cache"]);
        let config = StartupConfig::from_cli(&cli).unwrap();

        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/covid-cache")));
    }
}
