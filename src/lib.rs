pub mod config;
pub mod core;
pub mod databento;
pub mod domain;
pub mod mrci;
pub mod schema;
pub mod store;
pub mod utils;

pub use config::{FetchConfig, FetchOptions, ScrapeConfig, Universe};
pub use core::{DatabentoPipeline, EtlEngine, ScrapeJob};
pub use databento::HistoricalClient;
pub use mrci::{MrciParser, MrciSession};
pub use store::{BarStore, PgStore, ScrapeStore};
pub use utils::error::{EtlError, Result};
