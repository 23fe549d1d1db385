pub mod databento_pipeline;
pub mod etl;
pub mod scrape_job;

use crate::domain::model::{BarBatch, FetchBatch, LoadSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<FetchBatch>;
    async fn transform(&self, data: FetchBatch) -> Result<BarBatch>;
    async fn load(&self, batch: BarBatch) -> Result<LoadSummary>;
}

pub use databento_pipeline::DatabentoPipeline;
pub use etl::EtlEngine;
pub use scrape_job::ScrapeJob;
