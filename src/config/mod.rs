pub mod universe;

use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_date_order, validate_path, validate_url, Validate};
use chrono::{Days, NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;

pub use universe::Universe;

/// Configuration for the Databento fetch job.
#[derive(Debug, Clone, Parser)]
#[command(name = "databento-etl")]
#[command(about = "Fetch daily OHLCV bars from Databento into the seasonality schema")]
pub struct FetchConfig {
    #[arg(long, value_parser = parse_date, help = "Start date YYYY-MM-DD (default: 7 days before end)")]
    pub start: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date, help = "End date YYYY-MM-DD (default: today)")]
    pub end: Option<NaiveDate>,

    #[arg(long, help = "Fetch but do not write to the database")]
    pub dry_run: bool,

    #[arg(long, conflicts_with = "stocks_only", help = "Only fetch futures data")]
    pub futures_only: bool,

    #[arg(long, help = "Only fetch stock data")]
    pub stocks_only: bool,

    #[arg(long, help = "Universe definition TOML (default: built-in universe)")]
    pub universe: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub log_json: bool,
}

/// Resolved per-run settings handed to the Databento pipeline, decoupled from
/// the CLI surface so tests can construct them directly.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub dry_run: bool,
    pub fetch_futures: bool,
    pub fetch_stocks: bool,
}

impl FetchConfig {
    /// Concrete date range: end defaults to today, start to 7 days earlier.
    pub fn resolved_range(&self) -> (NaiveDate, NaiveDate) {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = self
            .start
            .unwrap_or_else(|| end.checked_sub_days(Days::new(7)).unwrap_or(end));
        (start, end)
    }

    pub fn fetch_futures(&self) -> bool {
        !self.stocks_only
    }

    pub fn fetch_stocks(&self) -> bool {
        !self.futures_only
    }

    pub fn options(&self) -> FetchOptions {
        let (start, end) = self.resolved_range();
        FetchOptions {
            start,
            end,
            dry_run: self.dry_run,
            fetch_futures: self.fetch_futures(),
            fetch_stocks: self.fetch_stocks(),
        }
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<()> {
        validate_date_order("start/end", self.start, self.end)
    }
}

/// Configuration for the MRCI scrape job.
#[derive(Debug, Clone, Parser)]
#[command(name = "mrci-etl")]
#[command(about = "Scrape MRCI daily OHLC pages into the seasonality schema")]
pub struct ScrapeConfig {
    #[arg(long, value_parser = parse_date, help = "Start date YYYY-MM-DD (default: resume checkpoint)")]
    pub start: Option<NaiveDate>,

    #[arg(long, value_parser = parse_date, help = "End date YYYY-MM-DD (default: today)")]
    pub end: Option<NaiveDate>,

    #[arg(long, default_value = "./mrci_profile", help = "Directory holding the persistent session cookies")]
    pub profile_dir: PathBuf,

    #[arg(long, default_value_t = 400, help = "Delay between page fetches in milliseconds")]
    pub throttle_ms: u64,

    #[arg(long, default_value = "https://www.mrci.com")]
    pub base_url: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub log_json: bool,
}

impl Validate for ScrapeConfig {
    fn validate(&self) -> Result<()> {
        validate_url("base-url", &self.base_url)?;
        validate_path("profile-dir", &self.profile_dir.to_string_lossy())?;
        validate_date_order("start/end", self.start, self.end)
    }
}

/// Secrets and connection strings come from the environment, never flags.
pub fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| EtlError::ConfigError {
        message: format!("{} environment variable not set", key),
    })
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_resolved_range_defaults() {
        let config = FetchConfig::parse_from(["databento-etl"]);
        let (start, end) = config.resolved_range();
        assert_eq!(end.checked_sub_days(Days::new(7)), Some(start));
    }

    #[test]
    fn test_fetch_config_explicit_range() {
        let config =
            FetchConfig::parse_from(["databento-etl", "--start", "2024-01-01", "--end", "2024-06-30"]);
        let (start, end) = config.resolved_range();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fetch_config_rejects_inverted_range() {
        let config =
            FetchConfig::parse_from(["databento-etl", "--start", "2024-06-30", "--end", "2024-01-01"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fetch_config_side_flags_conflict() {
        let result =
            FetchConfig::try_parse_from(["databento-etl", "--futures-only", "--stocks-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_config_side_selection() {
        let config = FetchConfig::parse_from(["databento-etl", "--futures-only"]);
        assert!(config.fetch_futures());
        assert!(!config.fetch_stocks());

        let config = FetchConfig::parse_from(["databento-etl", "--stocks-only"]);
        assert!(!config.fetch_futures());
        assert!(config.fetch_stocks());
    }

    #[test]
    fn test_scrape_config_defaults_and_validation() {
        let config = ScrapeConfig::parse_from(["mrci-etl"]);
        assert_eq!(config.throttle_ms, 400);
        assert_eq!(config.base_url, "https://www.mrci.com");
        assert_eq!(config.profile_dir, PathBuf::from("./mrci_profile"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scrape_config_rejects_bad_base_url() {
        let config = ScrapeConfig::parse_from(["mrci-etl", "--base-url", "ftp://mrci.com"]);
        assert!(config.validate().is_err());
    }
}
