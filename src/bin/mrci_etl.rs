use clap::Parser;
use seasonality_etl::config::{self, ScrapeConfig};
use seasonality_etl::utils::{logger, validation::Validate};
use seasonality_etl::{MrciParser, MrciSession, PgStore, ScrapeJob};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ScrapeConfig::parse();
    logger::init_logger(config.verbose, config.log_json);

    tracing::info!("starting mrci-etl");
    if config.verbose {
        tracing::debug!(?config, "CLI config");
    }

    if let Err(e) = config.validate() {
        tracing::error!("configuration validation failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let database_url = config::require_env("DATABASE_URL")?;
    let store = PgStore::connect(&database_url)?;
    let session = MrciSession::open(config.base_url.clone(), config.profile_dir.clone())?;
    let parser = MrciParser::new()?;

    let job = ScrapeJob::new(
        session,
        parser,
        store,
        Duration::from_millis(config.throttle_ms),
    );
    let summary = job.run(config.start, config.end).await?;

    tracing::info!(
        days_scraped = summary.days_scraped,
        days_blank = summary.days_blank,
        days_failed = summary.days_failed,
        rows_inserted = summary.rows_inserted,
        "mrci-etl complete"
    );
    Ok(())
}
