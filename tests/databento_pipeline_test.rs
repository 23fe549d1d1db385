use chrono::NaiveDate;
use httpmock::prelude::*;
use seasonality_etl::config::FetchOptions;
use seasonality_etl::domain::model::{NewContinuousBar, NewContractBar};
use seasonality_etl::utils::error::Result;
use seasonality_etl::{BarStore, DatabentoPipeline, EtlEngine, HistoricalClient, Universe};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct StoreState {
    schema_ensured: bool,
    assets: Vec<(String, String)>,
    contract_bars: Vec<NewContractBar>,
    continuous_bars: Vec<NewContinuousBar>,
}

#[derive(Clone, Default)]
struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl BarStore for MemoryStore {
    fn ensure_schema(&self) -> Result<()> {
        self.state.lock().unwrap().schema_ensured = true;
        Ok(())
    }

    fn ensure_assets(&self, symbols: &[String], kind: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for symbol in symbols {
            state.assets.push((symbol.clone(), kind.to_string()));
        }
        Ok(())
    }

    fn upsert_contract_bars(&self, bars: &[NewContractBar]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.contract_bars.extend_from_slice(bars);
        Ok(bars.len())
    }

    fn upsert_continuous_bars(&self, bars: &[NewContinuousBar]) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.continuous_bars.extend_from_slice(bars);
        Ok(bars.len())
    }
}

fn test_universe() -> Universe {
    Universe {
        futures_roots: BTreeMap::from([("ES".to_string(), "ES".to_string())]),
        stock_symbols: vec!["SPY".to_string()],
        ..Universe::default()
    }
}

fn test_options(dry_run: bool) -> FetchOptions {
    FetchOptions {
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        dry_run,
        fetch_futures: true,
        fetch_stocks: true,
    }
}

fn mock_market_data(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    // 2024-01-05 00:00:00 UTC, prices in fixed-point 1e-9 units
    let futures_body = concat!(
        r#"{"hd":{"ts_event":"1704412800000000000","instrument_id":11},"open":"4700250000000","high":"4720000000000","low":"4690500000000","close":"4710750000000","volume":"1000","symbol":"ESH4"}"#,
        "\n",
        r#"{"hd":{"ts_event":"1704412800000000000","instrument_id":12},"open":"4705000000000","high":"4725000000000","low":"4695000000000","close":"4715000000000","volume":"250","symbol":"ESM4"}"#,
        "\n",
    );
    let stocks_body = concat!(
        r#"{"hd":{"ts_event":"1704412800000000000","instrument_id":21},"open":"470100000000","high":"472000000000","low":"469000000000","close":"471500000000","volume":"9000","symbol":"SPY"}"#,
        "\n",
    );

    let futures_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v0/timeseries.get_range")
            .query_param("dataset", "GLBX.MDP3")
            .query_param("symbols", "ES")
            .query_param("stype_in", "parent")
            .query_param("schema", "ohlcv-1d");
        then.status(200).body(futures_body);
    });
    let stocks_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v0/timeseries.get_range")
            .query_param("dataset", "XNAS.ITCH")
            .query_param("symbols", "SPY")
            .query_param("schema", "ohlcv-1d");
        then.status(200).body(stocks_body);
    });
    (futures_mock, stocks_mock)
}

fn pipeline(
    server: &MockServer,
    store: MemoryStore,
    dry_run: bool,
) -> DatabentoPipeline<MemoryStore> {
    let client = HistoricalClient::with_base_url("test-key".to_string(), server.base_url())
        .unwrap()
        .with_retry(1, Duration::ZERO);
    DatabentoPipeline::new(client, store, test_universe(), test_options(dry_run))
}

#[tokio::test]
async fn test_end_to_end_fetch_and_load() {
    let server = MockServer::start();
    let (futures_mock, stocks_mock) = mock_market_data(&server);
    let store = MemoryStore::default();

    let engine = EtlEngine::new(pipeline(&server, store.clone(), false));
    let summary = engine.run().await.unwrap();

    futures_mock.assert();
    stocks_mock.assert();

    assert!(!summary.dry_run);
    assert_eq!(summary.contract_rows, 2);
    assert_eq!(summary.continuous_rows, 1);
    assert_eq!(summary.skipped, 0);

    let state = store.state.lock().unwrap();
    assert!(state.schema_ensured);

    assert_eq!(state.contract_bars.len(), 2);
    let first = &state.contract_bars[0];
    assert_eq!(first.symbol, "ES");
    assert_eq!(first.contract, "ESH4");
    assert_eq!(
        first.trade_date,
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    );
    assert!((first.open - 4700.25).abs() < 1e-9);
    assert!((first.close - 4710.75).abs() < 1e-9);
    assert_eq!(first.value, 1000);
    assert_eq!(first.instrument_id, Some(11));

    assert_eq!(state.continuous_bars.len(), 1);
    let stock = &state.continuous_bars[0];
    assert_eq!(stock.symbol, "STKSPY");
    assert!((stock.close - 471.5).abs() < 1e-9);

    assert!(state
        .assets
        .contains(&("ES".to_string(), "Futures".to_string())));
    assert!(state
        .assets
        .contains(&("STKSPY".to_string(), "Stock".to_string())));
}

#[tokio::test]
async fn test_end_to_end_dry_run_writes_nothing() {
    let server = MockServer::start();
    let (futures_mock, stocks_mock) = mock_market_data(&server);
    let store = MemoryStore::default();

    let engine = EtlEngine::new(pipeline(&server, store.clone(), true));
    let summary = engine.run().await.unwrap();

    futures_mock.assert();
    stocks_mock.assert();

    assert!(summary.dry_run);
    assert_eq!(summary.contract_rows, 2);
    assert_eq!(summary.continuous_rows, 1);

    let state = store.state.lock().unwrap();
    assert!(!state.schema_ensured);
    assert!(state.assets.is_empty());
    assert!(state.contract_bars.is_empty());
    assert!(state.continuous_bars.is_empty());
}

#[tokio::test]
async fn test_failed_futures_root_does_not_abort_run() {
    let server = MockServer::start();
    // Futures endpoint errors; stocks succeed.
    let futures_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v0/timeseries.get_range")
            .query_param("dataset", "GLBX.MDP3");
        then.status(500);
    });
    let stocks_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v0/timeseries.get_range")
            .query_param("dataset", "XNAS.ITCH");
        then.status(200).body(concat!(
            r#"{"hd":{"ts_event":"1704412800000000000"},"open":"470100000000","high":"472000000000","low":"469000000000","close":"471500000000","volume":"9000","symbol":"SPY"}"#,
            "\n",
        ));
    });
    let store = MemoryStore::default();

    let engine = EtlEngine::new(pipeline(&server, store.clone(), false));
    let summary = engine.run().await.unwrap();

    futures_mock.assert();
    stocks_mock.assert();

    assert_eq!(summary.contract_rows, 0);
    assert_eq!(summary.continuous_rows, 1);
}
