use crate::domain::model::DailyBar;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://hist.databento.com";

/// Fixed-point price scale used by the wire format (1e-9 units).
const PRICE_SCALE: f64 = 1e-9;

/// Request for a daily bar range. Futures use `parent` symbology to expand a
/// root into all of its child contracts.
#[derive(Debug, Clone)]
pub struct RangeRequest {
    pub dataset: String,
    pub symbols: Vec<String>,
    pub schema: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub stype_in: Option<String>,
}

impl RangeRequest {
    pub fn daily(
        dataset: impl Into<String>,
        symbols: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            symbols,
            schema: "ohlcv-1d".to_string(),
            start,
            end,
            stype_in: None,
        }
    }

    pub fn with_parent_symbology(mut self) -> Self {
        self.stype_in = Some("parent".to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct DatasetRange {
    pub start: String,
    pub end: String,
}

/// Thin client for the Databento historical HTTP API. The API key is sent as
/// the basic-auth username; `base_url` is overridable for tests.
pub struct HistoricalClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HistoricalClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        })
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Fetch daily bars for a symbol set. The response is newline-delimited
    /// JSON; records missing expected fields are counted and skipped.
    pub async fn get_range(&self, req: &RangeRequest) -> Result<Vec<DailyBar>> {
        let mut params = self.range_params(req);
        params.push(("encoding".to_string(), "json".to_string()));
        params.push(("map_symbols".to_string(), "true".to_string()));

        let body = self.get_text("/v0/timeseries.get_range", &params).await?;

        let mut bars = Vec::new();
        let mut undecodable = 0usize;
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line)?;
            match decode_bar(&value) {
                Some(bar) => bars.push(bar),
                None => undecodable += 1,
            }
        }
        if undecodable > 0 {
            tracing::debug!(undecodable, "skipped records missing expected fields");
        }
        Ok(bars)
    }

    pub async fn get_dataset_range(&self, dataset: &str) -> Result<DatasetRange> {
        let params = vec![("dataset".to_string(), dataset.to_string())];
        let body = self.get_text("/v0/metadata.get_dataset_range", &params).await?;
        let value: Value = serde_json::from_str(body.trim())?;

        let field = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|k| value.get(k))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match (field(&["start", "start_date"]), field(&["end", "end_date"])) {
            (Some(start), Some(end)) => Ok(DatasetRange { start, end }),
            _ => Err(EtlError::ProcessingError {
                message: format!("unexpected dataset range payload: {}", body.trim()),
            }),
        }
    }

    /// Cost estimate in USD for a range request. No data is fetched.
    pub async fn get_cost(&self, req: &RangeRequest) -> Result<f64> {
        let params = self.range_params(req);
        let body = self.get_text("/v0/metadata.get_cost", &params).await?;
        let value: Value = serde_json::from_str(body.trim())?;
        value.as_f64().ok_or_else(|| EtlError::ProcessingError {
            message: format!("unexpected cost payload: {}", body.trim()),
        })
    }

    fn range_params(&self, req: &RangeRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("dataset".to_string(), req.dataset.clone()),
            ("symbols".to_string(), req.symbols.join(",")),
            ("schema".to_string(), req.schema.clone()),
            ("start".to_string(), req.start.format("%Y-%m-%d").to_string()),
            ("end".to_string(), req.end.format("%Y-%m-%d").to_string()),
        ];
        if let Some(stype) = &req.stype_in {
            params.push(("stype_in".to_string(), stype.clone()));
        }
        params
    }

    async fn get_text(&self, path: &str, params: &[(String, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            let outcome = match self
                .http
                .get(&url)
                .basic_auth(&self.api_key, None::<&str>)
                .query(params)
                .send()
                .await
            {
                Ok(resp) => resp.error_for_status(),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(resp) => return Ok(resp.text().await?),
                Err(e) => {
                    // Client errors (bad key, unknown symbol) never succeed on
                    // retry; everything else gets another attempt.
                    let client_error = e.status().is_some_and(|s| s.is_client_error());
                    attempt += 1;
                    if client_error || attempt >= self.retry_attempts {
                        return Err(e.into());
                    }
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max = self.retry_attempts,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

fn decode_bar(value: &Value) -> Option<DailyBar> {
    let hd = value.get("hd")?;
    Some(DailyBar {
        symbol: value.get("symbol")?.as_str()?.to_string(),
        ts_event_ns: int_field(hd.get("ts_event")?)?,
        open: price_field(value.get("open")?)?,
        high: price_field(value.get("high")?)?,
        low: price_field(value.get("low")?)?,
        close: price_field(value.get("close")?)?,
        volume: int_field(value.get("volume")?)?,
        instrument_id: hd.get("instrument_id").and_then(int_field),
    })
}

/// Wire integers arrive either as JSON numbers or decimal strings.
fn int_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn price_field(value: &Value) -> Option<f64> {
    int_field(value).map(|fixed| fixed as f64 * PRICE_SCALE)
}
