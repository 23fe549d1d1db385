use crate::domain::model::ScrapeSummary;
use crate::mrci::{MrciParser, MrciSession};
use crate::store::ScrapeStore;
use crate::utils::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate, Utc};
use std::time::Duration;

/// First day with archived OHLC pages.
fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 4).unwrap_or(NaiveDate::MIN)
}

/// Walks MRCI daily pages from the resume checkpoint to the end date,
/// inserting parsed contract rows and advancing the checkpoint after every
/// day, scraped or not. Failed days are logged, never retried.
pub struct ScrapeJob<S: ScrapeStore> {
    session: MrciSession,
    parser: MrciParser,
    store: S,
    throttle: Duration,
}

impl<S: ScrapeStore> ScrapeJob<S> {
    pub fn new(session: MrciSession, parser: MrciParser, store: S, throttle: Duration) -> Self {
        Self {
            session,
            parser,
            store,
            throttle,
        }
    }

    pub async fn run(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ScrapeSummary> {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());

        self.store.ensure_schema()?;
        let lookup = self.store.asset_lookup()?;
        if lookup.is_empty() {
            return Err(EtlError::ConfigError {
                message: "assets table is empty; seed roots (CL, NG, ZS, ...) before scraping"
                    .to_string(),
            });
        }

        // An explicit start rewrites the checkpoint; otherwise resume.
        let mut current = match start {
            Some(date) => {
                self.store.set_last_scraped(date)?;
                date
            }
            None => self.store.last_scraped()?.unwrap_or_else(default_start),
        };
        tracing::info!(start = %current, end = %end, assets = lookup.len(), "starting MRCI scrape");

        if let Err(e) = self.session.warm_up(current.year()).await {
            tracing::debug!(error = %e, "warm-up request failed");
        }

        let mut summary = ScrapeSummary::default();
        while current <= end {
            match self.session.fetch_day(current).await {
                Ok(html) if MrciSession::is_challenge(&html) => {
                    self.store.set_last_scraped(current)?;
                    summary.days_failed += 1;
                    tracing::warn!(
                        date = %current,
                        "challenge page, skipping day (is the profile cookie still valid?)"
                    );
                }
                Ok(html) if html.to_lowercase().contains("<html") => {
                    let (rows, stats) = self.parser.parse_day(&html, current, &lookup);
                    let inserted = self.store.insert_contract_rows(&rows)?;
                    self.store.set_last_scraped(current)?;
                    summary.days_scraped += 1;
                    summary.rows_inserted += inserted;
                    tracing::info!(
                        date = %current,
                        had_table = stats.had_table,
                        lines = stats.lines_scanned,
                        parsed = stats.rows_parsed,
                        unknown_root = stats.rows_unknown_root,
                        bad = stats.rows_bad_format,
                        inserted,
                        "day scraped"
                    );
                    if !stats.unknown_sections.is_empty() {
                        tracing::debug!(sections = ?stats.unknown_sections, "unknown sections on page");
                    }
                    if inserted == 0 && stats.rows_parsed == 0 {
                        tracing::info!(date = %current, "no data for this day");
                    }
                }
                Ok(_) => {
                    self.store.set_last_scraped(current)?;
                    summary.days_blank += 1;
                    tracing::warn!(date = %current, "no data (blank page)");
                }
                Err(e) => {
                    // The checkpoint still advances; a bad day is not retried.
                    self.store.set_last_scraped(current)?;
                    summary.days_failed += 1;
                    tracing::warn!(date = %current, error = %e, "fetch failed");
                }
            }

            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
            if current <= end && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        tracing::info!(
            days_scraped = summary.days_scraped,
            days_blank = summary.days_blank,
            days_failed = summary.days_failed,
            rows_inserted = summary.rows_inserted,
            "scrape complete"
        );
        Ok(summary)
    }
}
