use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Symbol universe for the Databento job: which futures roots and stock
/// symbols to fetch, from which datasets, and how they map onto database
/// symbols. The defaults cover the seasonality universe; a TOML file can
/// override any field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default = "default_futures_dataset")]
    pub futures_dataset: String,

    #[serde(default = "default_stocks_dataset")]
    pub stocks_dataset: String,

    #[serde(default = "default_stock_prefix")]
    pub stock_prefix: String,

    /// Databento root -> database symbol. A few roots trade under different
    /// codes in the database (ZM -> SM, ZL -> BO, LE -> LC, HE -> LH).
    #[serde(default = "default_futures_roots")]
    pub futures_roots: BTreeMap<String, String>,

    #[serde(default = "default_stock_symbols")]
    pub stock_symbols: Vec<String>,
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            futures_dataset: default_futures_dataset(),
            stocks_dataset: default_stocks_dataset(),
            stock_prefix: default_stock_prefix(),
            futures_roots: default_futures_roots(),
            stock_symbols: default_stock_symbols(),
        }
    }
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn db_symbol(&self, root: &str) -> Option<&str> {
        self.futures_roots.get(root).map(String::as_str)
    }

    /// Distinct database symbols for the futures side, for asset seeding.
    pub fn futures_db_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.futures_roots.values().cloned().collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Prefixed database symbols for the stock side.
    pub fn stock_db_symbols(&self) -> Vec<String> {
        self.stock_symbols
            .iter()
            .map(|s| format!("{}{}", self.stock_prefix, s))
            .collect()
    }
}

fn default_futures_dataset() -> String {
    // CME/CBOT/NYMEX/COMEX futures
    "GLBX.MDP3".to_string()
}

fn default_stocks_dataset() -> String {
    // NASDAQ stocks
    "XNAS.ITCH".to_string()
}

fn default_stock_prefix() -> String {
    "STK".to_string()
}

fn default_futures_roots() -> BTreeMap<String, String> {
    [
        // Indices
        ("ES", "ES"),
        ("NQ", "NQ"),
        // Energy
        ("CL", "CL"),
        ("NG", "NG"),
        // Metals
        ("GC", "GC"),
        ("SI", "SI"),
        ("HG", "HG"),
        // Grains
        ("ZC", "ZC"),
        ("ZS", "ZS"),
        ("ZW", "ZW"),
        ("ZM", "SM"),
        ("ZL", "BO"),
        // Meats
        ("LE", "LC"),
        ("HE", "LH"),
        ("GF", "FC"),
        // Currencies
        ("6E", "6E"),
        ("6J", "6J"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_stock_symbols() -> Vec<String> {
    [
        // Major index ETFs
        "SPY", "QQQ", "IWM", "DIA",
        // Mega caps
        "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "BRK.B",
        // Tech
        "AMD", "INTC", "CRM", "ORCL", "ADBE", "CSCO", "AVGO", "TXN",
        // Finance
        "JPM", "BAC", "WFC", "GS", "MS", "V", "MA", "AXP",
        // Healthcare
        "UNH", "JNJ", "PFE", "MRK", "ABBV", "LLY", "TMO", "ABT",
        // Consumer
        "WMT", "HD", "MCD", "NKE", "SBUX", "TGT", "COST", "LOW",
        // Energy
        "XOM", "CVX", "COP", "SLB", "EOG", "MPC", "PSX", "VLO",
        // Industrials
        "CAT", "DE", "BA", "GE", "HON", "UPS", "RTX", "LMT",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_universe_shape() {
        let u = Universe::default();
        assert_eq!(u.futures_roots.len(), 17);
        assert_eq!(u.stock_symbols.len(), 60);
        assert_eq!(u.futures_dataset, "GLBX.MDP3");
        assert_eq!(u.stocks_dataset, "XNAS.ITCH");
    }

    #[test]
    fn test_renamed_roots_map_to_db_symbols() {
        let u = Universe::default();
        assert_eq!(u.db_symbol("ZM"), Some("SM"));
        assert_eq!(u.db_symbol("ZL"), Some("BO"));
        assert_eq!(u.db_symbol("LE"), Some("LC"));
        assert_eq!(u.db_symbol("HE"), Some("LH"));
        assert_eq!(u.db_symbol("GF"), Some("FC"));
        assert_eq!(u.db_symbol("ES"), Some("ES"));
        assert_eq!(u.db_symbol("XX"), None);
    }

    #[test]
    fn test_stock_db_symbols_are_prefixed() {
        let u = Universe::default();
        let symbols = u.stock_db_symbols();
        assert_eq!(symbols.len(), 60);
        assert!(symbols.contains(&"STKSPY".to_string()));
        assert!(symbols.contains(&"STKAAPL".to_string()));
    }

    #[test]
    fn test_partial_toml_override_keeps_defaults() {
        let u: Universe = toml::from_str(
            r#"
            stock_symbols = ["SPY"]

            [futures_roots]
            ES = "ES"
            "#,
        )
        .unwrap();
        assert_eq!(u.stock_symbols, vec!["SPY"]);
        assert_eq!(u.futures_roots.len(), 1);
        assert_eq!(u.futures_dataset, "GLBX.MDP3");
        assert_eq!(u.stock_prefix, "STK");
    }
}
