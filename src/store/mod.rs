pub mod pg;

use crate::domain::model::{NewContinuousBar, NewContractBar, NewMrciBar};
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::collections::HashMap;

pub use pg::PgStore;

/// Persistence port for the Databento job.
pub trait BarStore: Send + Sync {
    fn ensure_schema(&self) -> Result<()>;

    /// Seed missing asset rows; existing symbols are left untouched.
    fn ensure_assets(&self, symbols: &[String], kind: &str) -> Result<()>;

    /// Upsert per-contract futures bars keyed on (symbol, trade_date, contract).
    fn upsert_contract_bars(&self, bars: &[NewContractBar]) -> Result<usize>;

    /// Upsert stock bars keyed on (trade_date, symbol).
    fn upsert_continuous_bars(&self, bars: &[NewContinuousBar]) -> Result<usize>;
}

/// Persistence port for the MRCI scrape job.
pub trait ScrapeStore: Send + Sync {
    fn ensure_schema(&self) -> Result<()>;

    /// Root symbol -> asset id, for resolving parsed sections.
    fn asset_lookup(&self) -> Result<HashMap<String, i32>>;

    /// Insert scraped rows, ignoring duplicates. Returns the number of rows
    /// actually inserted.
    fn insert_contract_rows(&self, rows: &[NewMrciBar]) -> Result<usize>;

    fn last_scraped(&self) -> Result<Option<NaiveDate>>;

    fn set_last_scraped(&self, date: NaiveDate) -> Result<()>;
}
