//! Checks Databento dataset access and reports cost estimates for the
//! configured universe. No data is fetched.

use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate, Utc};
use clap::Parser;
use seasonality_etl::config::{self, Universe};
use seasonality_etl::databento::RangeRequest;
use seasonality_etl::domain::contracts::active_contracts;
use seasonality_etl::utils::logger;
use seasonality_etl::HistoricalClient;

#[derive(Debug, Parser)]
#[command(name = "check-databento")]
#[command(about = "Check Databento dataset access and estimate costs (no data is fetched)")]
struct CheckConfig {
    #[arg(long, help = "Universe definition TOML (default: built-in universe)")]
    universe: Option<std::path::PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CheckConfig::parse();
    logger::init_logger(config.verbose, false);

    let universe = match &config.universe {
        Some(path) => Universe::from_file(path)?,
        None => Universe::default(),
    };
    let api_key = config::require_env("DATABENTO_API_KEY")?;
    let client = HistoricalClient::new(api_key)?;

    let today = Utc::now().date_naive();
    let week_ago = today.checked_sub_days(Days::new(7)).unwrap_or(today);

    println!("{}", "=".repeat(60));
    println!("DATABENTO API CHECK (no data fetched)");
    println!("{}", "=".repeat(60));

    // Futures dataset access is the hard prerequisite; bail early without it.
    println!("\n1. Dataset access");
    let range = client
        .get_dataset_range(&universe.futures_dataset)
        .await
        .with_context(|| format!("cannot access {}", universe.futures_dataset))?;
    println!(
        "  ✅ {}: {} to {}",
        universe.futures_dataset, range.start, range.end
    );

    println!("\n2. Futures roots, 7-day cost (parent symbology)");
    let mut available_roots: Vec<String> = Vec::new();
    let mut total_7day_cost = 0.0;
    for root in universe.futures_roots.keys() {
        let request = RangeRequest::daily(
            universe.futures_dataset.as_str(),
            vec![root.clone()],
            week_ago,
            today,
        )
        .with_parent_symbology();
        match client.get_cost(&request).await {
            Ok(cost) => {
                println!("  ✅ {:4} ${:.4}", root, cost);
                available_roots.push(root.clone());
                total_7day_cost += cost;
            }
            Err(e) => println!("  ❌ {:4} {}", root, e),
        }
    }
    println!(
        "  7-day total for {} roots: ${:.2}",
        available_roots.len(),
        total_7day_cost
    );

    if !available_roots.is_empty() {
        let last_year = today.year() - 1;
        let year_range = (
            NaiveDate::from_ymd_opt(last_year, 1, 1),
            NaiveDate::from_ymd_opt(last_year, 12, 29),
        );
        if let (Some(start), Some(end)) = year_range {
            println!("\n3. Full-year cost estimate ({})", last_year);
            let request = RangeRequest::daily(
                universe.futures_dataset.as_str(),
                available_roots.clone(),
                start,
                end,
            )
            .with_parent_symbology();
            match client.get_cost(&request).await {
                Ok(cost) => println!("  all {} roots: ${:.2}", available_roots.len(), cost),
                Err(e) => println!(
                    "  estimate failed ({}); 7-day x 52 gives ~${:.2}",
                    e,
                    total_7day_cost * 52.0
                ),
            }
        }

        if let Some(backfill_start) = NaiveDate::from_ymd_opt(last_year - 4, 1, 1) {
            println!("\n4. 5-year backfill cost estimate ({}..{})", last_year - 4, last_year);
            let request = RangeRequest::daily(
                universe.futures_dataset.as_str(),
                available_roots.clone(),
                backfill_start,
                today,
            )
            .with_parent_symbology();
            match client.get_cost(&request).await {
                Ok(cost) => println!("  all {} roots: ${:.2}", available_roots.len(), cost),
                Err(e) => println!("  estimate failed: {}", e),
            }
        }
    }

    println!("\n5. Stocks ({})", universe.stocks_dataset);
    match client.get_dataset_range(&universe.stocks_dataset).await {
        Ok(range) => {
            println!("  ✅ available: {} to {}", range.start, range.end);
            let mut available_stocks = 0usize;
            let mut stock_7day_cost = 0.0;
            for symbol in universe.stock_symbols.iter().take(8) {
                let request = RangeRequest::daily(
                    universe.stocks_dataset.as_str(),
                    vec![symbol.clone()],
                    week_ago,
                    today,
                );
                match client.get_cost(&request).await {
                    Ok(cost) => {
                        println!("  ✅ {}: ${:.4}", symbol, cost);
                        available_stocks += 1;
                        stock_7day_cost += cost;
                    }
                    Err(e) => println!("  ❌ {}: {}", symbol, e),
                }
            }
            println!(
                "  7-day total for {} sampled stocks: ${:.4}",
                available_stocks, stock_7day_cost
            );
        }
        Err(e) => println!("  ❌ not available: {}", e),
    }

    println!("\n6. Contracts in scope today");
    for root in &available_roots {
        println!("  {:4} {}", root, active_contracts(root, today).join(" "));
    }

    println!("\n{}", "=".repeat(60));
    println!("No data was fetched; figures above are estimates only.");
    println!("Next: run databento-etl --dry-run to preview a real fetch.");
    Ok(())
}
