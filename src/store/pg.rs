use crate::domain::model::{NewAsset, NewContinuousBar, NewContractBar, NewMrciBar};
use crate::store::{BarStore, ScrapeStore};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// Idempotent DDL issued at job start, mirroring what the jobs expect to find
/// in an already-provisioned database.
const DDL: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS seasonality",
    "CREATE TABLE IF NOT EXISTS seasonality.assets (
        id SERIAL PRIMARY KEY,
        symbol TEXT NOT NULL UNIQUE,
        name TEXT
    )",
    "CREATE TABLE IF NOT EXISTS seasonality.historical_data (
        id BIGSERIAL PRIMARY KEY,
        symbol TEXT NOT NULL,
        trade_date DATE NOT NULL,
        open DOUBLE PRECISION NOT NULL,
        high DOUBLE PRECISION NOT NULL,
        low DOUBLE PRECISION NOT NULL,
        close DOUBLE PRECISION NOT NULL,
        value BIGINT NOT NULL,
        contract TEXT NOT NULL,
        instrument_id BIGINT,
        UNIQUE (symbol, trade_date, contract)
    )",
    "CREATE TABLE IF NOT EXISTS seasonality.continuous_prices (
        trade_date DATE NOT NULL,
        symbol TEXT NOT NULL,
        open DOUBLE PRECISION NOT NULL,
        high DOUBLE PRECISION NOT NULL,
        low DOUBLE PRECISION NOT NULL,
        close DOUBLE PRECISION NOT NULL,
        PRIMARY KEY (trade_date, symbol)
    )",
    "CREATE TABLE IF NOT EXISTS seasonality.mrci_contract_prices (
        id BIGSERIAL PRIMARY KEY,
        asset_id INT NOT NULL REFERENCES seasonality.assets(id) ON DELETE CASCADE,
        trade_date DATE NOT NULL,
        open DOUBLE PRECISION,
        high DOUBLE PRECISION,
        low DOUBLE PRECISION,
        close DOUBLE PRECISION,
        volume BIGINT,
        open_interest BIGINT,
        contract_code TEXT NOT NULL,
        UNIQUE (asset_id, trade_date, contract_code)
    )",
    "CREATE INDEX IF NOT EXISTS idx_mrci_contract_base
        ON seasonality.mrci_contract_prices (asset_id, trade_date)",
    "CREATE INDEX IF NOT EXISTS idx_mrci_contract_oi
        ON seasonality.mrci_contract_prices (asset_id, trade_date, open_interest DESC)",
    "CREATE TABLE IF NOT EXISTS seasonality.scrape_log_mrci (
        id SMALLINT PRIMARY KEY DEFAULT 1,
        last_date DATE NOT NULL,
        updated_at TIMESTAMP NOT NULL DEFAULT NOW()
    )",
];

/// Postgres-backed store shared by both jobs. The hosted database only
/// accepts TLS, so `sslmode=require` is appended when the URL does not pick
/// a mode itself.
pub struct PgStore {
    conn: Mutex<PgConnection>,
}

impl PgStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let url = enforce_tls(database_url)?;
        let conn = PgConnection::establish(&url)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, PgConnection>> {
        self.conn.lock().map_err(|_| EtlError::ProcessingError {
            message: "database connection mutex poisoned".to_string(),
        })
    }

    fn run_ddl(&self) -> Result<()> {
        let mut conn = self.conn()?;
        for statement in DDL {
            diesel::sql_query(*statement).execute(&mut *conn)?;
        }
        Ok(())
    }
}

fn enforce_tls(database_url: &str) -> Result<String> {
    let mut url = Url::parse(database_url).map_err(|e| EtlError::ConfigError {
        message: format!("invalid DATABASE_URL: {}", e),
    })?;
    let has_sslmode = url.query_pairs().any(|(k, _)| k == "sslmode");
    if !has_sslmode {
        url.query_pairs_mut().append_pair("sslmode", "require");
    }
    Ok(url.to_string())
}

impl BarStore for PgStore {
    fn ensure_schema(&self) -> Result<()> {
        self.run_ddl()
    }

    fn ensure_assets(&self, symbols: &[String], kind: &str) -> Result<()> {
        use crate::schema::assets::dsl as a;

        if symbols.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewAsset> = symbols
            .iter()
            .map(|symbol| NewAsset {
                symbol: symbol.clone(),
                name: Some(format!("{} {}", symbol, kind)),
            })
            .collect();

        let mut conn = self.conn()?;
        diesel::insert_into(a::assets)
            .values(&rows)
            .on_conflict(a::symbol)
            .do_nothing()
            .execute(&mut *conn)?;
        Ok(())
    }

    fn upsert_contract_bars(&self, bars: &[NewContractBar]) -> Result<usize> {
        use crate::schema::historical_data::dsl as hd;

        if bars.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let count = diesel::insert_into(hd::historical_data)
            .values(bars)
            .on_conflict((hd::symbol, hd::trade_date, hd::contract))
            .do_update()
            .set((
                hd::open.eq(excluded(hd::open)),
                hd::high.eq(excluded(hd::high)),
                hd::low.eq(excluded(hd::low)),
                hd::close.eq(excluded(hd::close)),
                hd::value.eq(excluded(hd::value)),
            ))
            .execute(&mut *conn)?;
        Ok(count)
    }

    fn upsert_continuous_bars(&self, bars: &[NewContinuousBar]) -> Result<usize> {
        use crate::schema::continuous_prices::dsl as cp;

        if bars.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let count = diesel::insert_into(cp::continuous_prices)
            .values(bars)
            .on_conflict((cp::trade_date, cp::symbol))
            .do_update()
            .set((
                cp::open.eq(excluded(cp::open)),
                cp::high.eq(excluded(cp::high)),
                cp::low.eq(excluded(cp::low)),
                cp::close.eq(excluded(cp::close)),
            ))
            .execute(&mut *conn)?;
        Ok(count)
    }
}

impl ScrapeStore for PgStore {
    fn ensure_schema(&self) -> Result<()> {
        self.run_ddl()
    }

    fn asset_lookup(&self) -> Result<HashMap<String, i32>> {
        use crate::schema::assets::dsl as a;

        let mut conn = self.conn()?;
        let rows: Vec<(i32, String)> = a::assets.select((a::id, a::symbol)).load(&mut *conn)?;
        Ok(rows.into_iter().map(|(id, symbol)| (symbol, id)).collect())
    }

    fn insert_contract_rows(&self, rows: &[NewMrciBar]) -> Result<usize> {
        use crate::schema::mrci_contract_prices::dsl as mcp;

        if rows.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let count = diesel::insert_into(mcp::mrci_contract_prices)
            .values(rows)
            .on_conflict((mcp::asset_id, mcp::trade_date, mcp::contract_code))
            .do_nothing()
            .execute(&mut *conn)?;
        Ok(count)
    }

    fn last_scraped(&self) -> Result<Option<NaiveDate>> {
        use crate::schema::scrape_log_mrci::dsl as log;

        let mut conn = self.conn()?;
        let date = log::scrape_log_mrci
            .filter(log::id.eq(1i16))
            .select(log::last_date)
            .first::<NaiveDate>(&mut *conn)
            .optional()?;
        Ok(date)
    }

    fn set_last_scraped(&self, date: NaiveDate) -> Result<()> {
        use crate::schema::scrape_log_mrci::dsl as log;

        let mut conn = self.conn()?;
        diesel::insert_into(log::scrape_log_mrci)
            .values((log::id.eq(1i16), log::last_date.eq(date)))
            .on_conflict(log::id)
            .do_update()
            .set((
                log::last_date.eq(date),
                log::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforce_tls_appends_sslmode() {
        let url = enforce_tls("postgresql://user:pw@db.example.com:5432/prices").unwrap();
        assert!(url.ends_with("sslmode=require"));
    }

    #[test]
    fn test_enforce_tls_respects_explicit_mode() {
        let url =
            enforce_tls("postgresql://user:pw@localhost/prices?sslmode=disable").unwrap();
        assert!(url.contains("sslmode=disable"));
        assert!(!url.contains("sslmode=require"));
    }

    #[test]
    fn test_enforce_tls_rejects_garbage() {
        assert!(enforce_tls("not a url").is_err());
    }
}
