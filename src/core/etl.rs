use crate::core::Pipeline;
use crate::domain::model::LoadSummary;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a pipeline's extract, transform and load stages in order.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<LoadSummary> {
        tracing::info!("starting ETL run");

        let raw = self.pipeline.extract().await?;
        tracing::info!(
            futures = raw.futures.len(),
            stocks = raw.stocks.len(),
            "extract complete"
        );
        self.monitor.log_stats("extract");

        let batch = self.pipeline.transform(raw).await?;
        tracing::info!(
            contract_bars = batch.contract_bars.len(),
            continuous_bars = batch.continuous_bars.len(),
            skipped = batch.skipped,
            "transform complete"
        );
        self.monitor.log_stats("transform");

        let summary = self.pipeline.load(batch).await?;
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
