use crate::domain::model::NewMrciBar;
use crate::utils::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Parse counters for one scraped day, logged after every page.
#[derive(Debug, Clone, Default)]
pub struct DayStats {
    pub had_table: bool,
    pub lines_scanned: usize,
    pub rows_parsed: usize,
    pub rows_unknown_root: usize,
    pub rows_bad_format: usize,
    pub unknown_sections: Vec<String>,
}

/// Extracts contract rows from an MRCI daily OHLC page.
///
/// The page carries one `<table class="strat">` whose `<th class="note1">`
/// rows name a commodity section (e.g. `Corn(CBOT)`); the data rows that
/// follow belong to that section until the next header.
pub struct MrciParser {
    table_re: Regex,
    row_re: Regex,
    note_re: Regex,
    cell_re: Regex,
    tag_re: Regex,
    yymmdd_re: Regex,
}

impl MrciParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table_re: Regex::new(r#"(?is)<table[^>]*class="[^"]*\bstrat\b[^"]*"[^>]*>(.*?)</table>"#)?,
            row_re: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>")?,
            note_re: Regex::new(r#"(?is)<th[^>]*class="[^"]*\bnote1\b[^"]*"[^>]*>(.*?)</th>"#)?,
            cell_re: Regex::new(r"(?is)<td[^>]*>(.*?)</td>")?,
            tag_re: Regex::new(r"(?s)<[^>]+>")?,
            yymmdd_re: Regex::new(r"^\d{6}$")?,
        })
    }

    /// Parse one day's page. Rows in sections that do not map to a known
    /// asset are counted, not inserted; rows whose date cell is unparsable
    /// fall back to `fallback_date`.
    pub fn parse_day(
        &self,
        html: &str,
        fallback_date: NaiveDate,
        asset_lookup: &HashMap<String, i32>,
    ) -> (Vec<NewMrciBar>, DayStats) {
        let mut stats = DayStats::default();
        let mut rows = Vec::new();

        let table = match self.table_re.captures(html).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return (rows, stats),
        };
        stats.had_table = true;

        let mut unknown_sections = BTreeSet::new();
        let mut current_root: Option<&'static str> = None;

        for row_cap in self.row_re.captures_iter(table) {
            let row_html = match row_cap.get(1) {
                Some(m) => m.as_str(),
                None => continue,
            };

            // Section header switches the current commodity.
            if let Some(note) = self.note_re.captures(row_html).and_then(|c| c.get(1)) {
                let name = self.clean_cell(note.as_str());
                current_root = section_root(&name);
                if current_root.is_none() {
                    unknown_sections.insert(name);
                }
                continue;
            }

            let cells: Vec<String> = self
                .cell_re
                .captures_iter(row_html)
                .filter_map(|c| c.get(1).map(|m| self.clean_cell(m.as_str())))
                .collect();
            if cells.is_empty() {
                continue;
            }
            if cells[0].to_lowercase().starts_with("total volume") {
                continue;
            }
            if cells.len() < 8 {
                continue;
            }

            stats.lines_scanned += 1;

            let asset_id = match current_root.and_then(|root| asset_lookup.get(root)) {
                Some(id) => *id,
                None => {
                    stats.rows_unknown_root += 1;
                    continue;
                }
            };

            let contract_code = cells[0].clone();
            let trade_date = self.parse_yymmdd(&cells[1]).unwrap_or(fallback_date);
            let open_interest = match cells.get(8) {
                Some(cell) => to_int(cell),
                None => Ok(None),
            };

            match (
                to_float(&cells[2]),
                to_float(&cells[3]),
                to_float(&cells[4]),
                to_float(&cells[5]),
                to_int(&cells[7]),
                open_interest,
            ) {
                (Ok(open), Ok(high), Ok(low), Ok(close), Ok(volume), Ok(open_interest)) => {
                    rows.push(NewMrciBar {
                        asset_id,
                        trade_date,
                        open,
                        high,
                        low,
                        close,
                        volume,
                        open_interest,
                        contract_code,
                    });
                    stats.rows_parsed += 1;
                }
                _ => stats.rows_bad_format += 1,
            }
        }

        stats.unknown_sections = unknown_sections.into_iter().collect();
        (rows, stats)
    }

    /// Per-row dates come as `yymmdd`; years 70..99 belong to the 1900s.
    fn parse_yymmdd(&self, cell: &str) -> Option<NaiveDate> {
        let x = cell.trim();
        if !self.yymmdd_re.is_match(x) {
            return None;
        }
        let yy: i32 = x[..2].parse().ok()?;
        let year = if yy >= 70 { 1900 + yy } else { 2000 + yy };
        let month: u32 = x[2..4].parse().ok()?;
        let day: u32 = x[4..6].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn clean_cell(&self, raw: &str) -> String {
        let text = self.tag_re.replace_all(raw, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Section heading -> database root symbol.
fn section_root(name: &str) -> Option<&'static str> {
    Some(match name {
        "Soybeans(CBOT)" => "S",
        "Soybean Meal(CBOT)" => "SM",
        "Soybean Oil(CBOT)" => "BO",
        "Corn(CBOT)" => "C",
        "Wheat(CBOT)" => "W",
        "Wheat(KCBT)" => "KW",
        "Wheat(MGE)" => "MW",
        "Oats(CBOT)" => "O",
        "Rough Rice(CBOT)" => "RR",
        "Live Cattle(CME)" => "LC",
        "Feeder Cattle(CME)" => "FC",
        "Lean Hogs(CME)" => "LH",
        "Pork Bellies(CME)" => "PB",
        "Class III Milk(CME)" => "DA",
        "Cocoa(ICE)" => "CC",
        "Coffee \"C\"(ICE)" => "KC",
        "Sugar #11(ICE)" => "SB",
        "Cotton(ICE)" => "CT",
        "Orange Juice(ICE)" => "OJ",
        "Canola(WCE)" => "RS",
        "London Cocoa(LCE)" => "LCC",
        "London Sugar(LCE)" => "LSU",
        _ => return None,
    })
}

/// Blank, `-`, and `&nbsp;` cells are NULL; thousands separators are commas.
fn to_float(cell: &str) -> std::result::Result<Option<f64>, ()> {
    let x = cell.replace(',', "");
    let x = x.trim();
    if x.is_empty() || x == "-" {
        return Ok(None);
    }
    x.parse().map(Some).map_err(|_| ())
}

fn to_int(cell: &str) -> std::result::Result<Option<i64>, ()> {
    let x = cell.replace(',', "");
    let x = x.trim();
    if x.is_empty() || x == "-" {
        return Ok(None);
    }
    x.parse().map(Some).map_err(|_| ())
}
