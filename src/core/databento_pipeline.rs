use crate::config::{FetchOptions, Universe};
use crate::core::Pipeline;
use crate::databento::{HistoricalClient, RangeRequest};
use crate::domain::model::{BarBatch, FetchBatch, LoadSummary, NewContinuousBar, NewContractBar};
use crate::store::BarStore;
use crate::utils::error::Result;

/// The stocks endpoint times out on very large symbol lists, so requests go
/// out in fixed-size batches.
const STOCK_BATCH_SIZE: usize = 50;

/// Fetches daily bars from Databento and lands them in the seasonality
/// schema: futures contracts into `historical_data` (input to the
/// volume-based roll), stocks straight into `continuous_prices`.
pub struct DatabentoPipeline<S: BarStore> {
    client: HistoricalClient,
    store: S,
    universe: Universe,
    options: FetchOptions,
}

impl<S: BarStore> DatabentoPipeline<S> {
    pub fn new(client: HistoricalClient, store: S, universe: Universe, options: FetchOptions) -> Self {
        Self {
            client,
            store,
            universe,
            options,
        }
    }
}

#[async_trait::async_trait]
impl<S: BarStore> Pipeline for DatabentoPipeline<S> {
    async fn extract(&self) -> Result<FetchBatch> {
        let mut batch = FetchBatch::default();

        if self.options.fetch_futures {
            tracing::info!(
                roots = self.universe.futures_roots.len(),
                start = %self.options.start,
                end = %self.options.end,
                "fetching futures roots"
            );
            for root in self.universe.futures_roots.keys() {
                let request = RangeRequest::daily(
                    self.universe.futures_dataset.as_str(),
                    vec![root.clone()],
                    self.options.start,
                    self.options.end,
                )
                .with_parent_symbology();

                // One bad root must not sink the rest of the universe.
                match self.client.get_range(&request).await {
                    Ok(bars) => {
                        tracing::info!(root = %root, records = bars.len(), "fetched futures root");
                        batch
                            .futures
                            .extend(bars.into_iter().map(|bar| (root.clone(), bar)));
                    }
                    Err(e) => {
                        tracing::warn!(root = %root, error = %e, "futures fetch failed, skipping root")
                    }
                }
            }
        }

        if self.options.fetch_stocks {
            tracing::info!(
                symbols = self.universe.stock_symbols.len(),
                "fetching stock symbols"
            );
            for (i, chunk) in self
                .universe
                .stock_symbols
                .chunks(STOCK_BATCH_SIZE)
                .enumerate()
            {
                let request = RangeRequest::daily(
                    self.universe.stocks_dataset.as_str(),
                    chunk.to_vec(),
                    self.options.start,
                    self.options.end,
                );

                match self.client.get_range(&request).await {
                    Ok(bars) => {
                        tracing::info!(batch = i + 1, records = bars.len(), "fetched stock batch");
                        batch.stocks.extend(bars);
                    }
                    Err(e) => {
                        tracing::warn!(batch = i + 1, error = %e, "stock batch failed, skipping")
                    }
                }
            }
        }

        Ok(batch)
    }

    async fn transform(&self, data: FetchBatch) -> Result<BarBatch> {
        let mut batch = BarBatch::default();

        for (root, bar) in data.futures {
            let Some(db_symbol) = self.universe.db_symbol(&root) else {
                batch.skipped += 1;
                continue;
            };
            let Some(trade_date) = bar.trade_date() else {
                batch.skipped += 1;
                continue;
            };
            if bar.close <= 0.0 {
                batch.skipped += 1;
                continue;
            }
            batch.contract_bars.push(NewContractBar {
                symbol: db_symbol.to_string(),
                trade_date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                value: bar.volume,
                contract: bar.symbol,
                instrument_id: bar.instrument_id,
            });
        }

        for bar in data.stocks {
            let Some(trade_date) = bar.trade_date() else {
                batch.skipped += 1;
                continue;
            };
            if bar.close <= 0.0 {
                batch.skipped += 1;
                continue;
            }
            batch.continuous_bars.push(NewContinuousBar {
                trade_date,
                symbol: format!("{}{}", self.universe.stock_prefix, bar.symbol),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            });
        }

        Ok(batch)
    }

    async fn load(&self, batch: BarBatch) -> Result<LoadSummary> {
        let mut summary = LoadSummary {
            skipped: batch.skipped,
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if self.options.dry_run {
            summary.contract_rows = batch.contract_bars.len();
            summary.continuous_rows = batch.continuous_bars.len();
            tracing::info!(
                contract_bars = summary.contract_rows,
                continuous_bars = summary.continuous_rows,
                "dry run, nothing written"
            );
            if let Some(sample) = batch.contract_bars.first() {
                tracing::info!(?sample, "sample contract bar");
            }
            if let Some(sample) = batch.continuous_bars.first() {
                tracing::info!(?sample, "sample continuous bar");
            }
            return Ok(summary);
        }

        self.store.ensure_schema()?;
        if self.options.fetch_futures {
            self.store
                .ensure_assets(&self.universe.futures_db_symbols(), "Futures")?;
        }
        if self.options.fetch_stocks {
            self.store
                .ensure_assets(&self.universe.stock_db_symbols(), "Stock")?;
        }

        summary.contract_rows = self.store.upsert_contract_bars(&batch.contract_bars)?;
        summary.continuous_rows = self.store.upsert_continuous_bars(&batch.continuous_bars)?;
        tracing::info!(
            contract_rows = summary.contract_rows,
            continuous_rows = summary.continuous_rows,
            "load complete"
        );
        Ok(summary)
    }
}
