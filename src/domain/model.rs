use chrono::{DateTime, NaiveDate};
use diesel::prelude::*;

/// One daily OHLCV bar as decoded from the market-data API.
///
/// Prices are already scaled to floats; `ts_event_ns` is the event timestamp
/// in nanoseconds since the epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub symbol: String,
    pub ts_event_ns: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub instrument_id: Option<i64>,
}

impl DailyBar {
    /// Trade date derived from the event timestamp (UTC).
    pub fn trade_date(&self) -> Option<NaiveDate> {
        let secs = self.ts_event_ns.div_euclid(1_000_000_000);
        let nanos = self.ts_event_ns.rem_euclid(1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos).map(|dt| dt.date_naive())
    }
}

/// Extraction output of the Databento pipeline. Futures bars carry the root
/// they were requested under so the transform stage can map them to database
/// symbols.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    pub futures: Vec<(String, DailyBar)>,
    pub stocks: Vec<DailyBar>,
}

impl FetchBatch {
    pub fn total(&self) -> usize {
        self.futures.len() + self.stocks.len()
    }
}

/// Insert model for per-contract futures bars. `value` holds the traded
/// volume used downstream for volume-based roll detection.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::historical_data)]
pub struct NewContractBar {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub value: i64,
    pub contract: String,
    pub instrument_id: Option<i64>,
}

/// Insert model for stock bars, which skip the roll and land directly in the
/// continuous series.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::continuous_prices)]
pub struct NewContinuousBar {
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Insert model for scraped MRCI contract rows. Price and volume cells may be
/// blank on the source page, hence the options.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::mrci_contract_prices)]
pub struct NewMrciBar {
    pub asset_id: i32,
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub contract_code: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::assets)]
pub struct NewAsset {
    pub symbol: String,
    pub name: Option<String>,
}

/// Transform output of the Databento pipeline.
#[derive(Debug, Clone, Default)]
pub struct BarBatch {
    pub contract_bars: Vec<NewContractBar>,
    pub continuous_bars: Vec<NewContinuousBar>,
    pub skipped: usize,
}

/// Load-stage result reported by the Databento job.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub contract_rows: usize,
    pub continuous_rows: usize,
    pub skipped: usize,
    pub dry_run: bool,
}

/// Result of one MRCI scrape run.
#[derive(Debug, Clone, Default)]
pub struct ScrapeSummary {
    pub days_scraped: usize,
    pub days_blank: usize,
    pub days_failed: usize,
    pub rows_inserted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_date_from_nanosecond_timestamp() {
        // 2024-01-05 00:00:00 UTC
        let bar = DailyBar {
            symbol: "ESH4".to_string(),
            ts_event_ns: 1_704_412_800_000_000_000,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10,
            instrument_id: None,
        };
        assert_eq!(bar.trade_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn test_trade_date_mid_session_timestamp_keeps_same_day() {
        // 2024-01-05 17:30:00 UTC
        let bar = DailyBar {
            symbol: "SPY".to_string(),
            ts_event_ns: 1_704_475_800_000_000_000,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10,
            instrument_id: None,
        };
        assert_eq!(bar.trade_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }
}
