use clap::Parser;
use seasonality_etl::config::{self, FetchConfig, Universe};
use seasonality_etl::utils::{logger, validation::Validate};
use seasonality_etl::{DatabentoPipeline, EtlEngine, HistoricalClient, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = FetchConfig::parse();
    logger::init_logger(config.verbose, config.log_json);

    tracing::info!("starting databento-etl");
    if config.verbose {
        tracing::debug!(?config, "CLI config");
    }

    if let Err(e) = config.validate() {
        tracing::error!("configuration validation failed: {}", e);
        eprintln!("{}", e);
        std::process::exit(2);
    }

    let universe = match &config.universe {
        Some(path) => Universe::from_file(path)?,
        None => Universe::default(),
    };

    let api_key = config::require_env("DATABENTO_API_KEY")?;
    let database_url = config::require_env("DATABASE_URL")?;

    let options = config.options();
    tracing::info!(
        start = %options.start,
        end = %options.end,
        dry_run = options.dry_run,
        futures = options.fetch_futures,
        stocks = options.fetch_stocks,
        "run options"
    );

    let store = PgStore::connect(&database_url)?;
    let client = HistoricalClient::new(api_key)?;
    let pipeline = DatabentoPipeline::new(client, store, universe, options);
    let engine = EtlEngine::new_with_monitoring(pipeline, config.monitor);

    let summary = engine.run().await?;
    tracing::info!(
        contract_rows = summary.contract_rows,
        continuous_rows = summary.continuous_rows,
        skipped = summary.skipped,
        dry_run = summary.dry_run,
        "databento-etl complete"
    );
    if !summary.dry_run && summary.contract_rows > 0 {
        tracing::info!("next step: run the continuous-price roll to fold new contract bars in");
    }
    Ok(())
}
