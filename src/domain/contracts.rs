use chrono::{Datelike, NaiveDate};

/// CME-style contract month codes, January through December.
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// Front contract symbols for a root on a given trade date.
///
/// Returns the next four delivery months starting with the current calendar
/// month, two-digit years, e.g. `ESX24, ESZ24, ESF25, ESG25` for ES in
/// November 2024.
pub fn active_contracts(root: &str, trade_date: NaiveDate) -> Vec<String> {
    let current_month = trade_date.month0() as usize;
    let current_year = (trade_date.year() % 100) as usize;

    (0..4)
        .map(|i| {
            let month_idx = (current_month + i) % 12;
            let year = if current_month + i < 12 {
                current_year
            } else {
                (current_year + 1) % 100
            };
            format!("{}{}{:02}", root, MONTH_CODES[month_idx], year)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_active_contracts_mid_year() {
        assert_eq!(
            active_contracts("CL", date(2024, 3, 15)),
            vec!["CLH24", "CLJ24", "CLK24", "CLM24"]
        );
    }

    #[test]
    fn test_active_contracts_roll_over_year_end() {
        assert_eq!(
            active_contracts("ES", date(2024, 11, 15)),
            vec!["ESX24", "ESZ24", "ESF25", "ESG25"]
        );
    }

    #[test]
    fn test_active_contracts_december_start() {
        assert_eq!(
            active_contracts("GC", date(2024, 12, 2)),
            vec!["GCZ24", "GCF25", "GCG25", "GCH25"]
        );
    }

    #[test]
    fn test_active_contracts_century_wrap() {
        assert_eq!(
            active_contracts("NG", date(2099, 12, 1)),
            vec!["NGZ99", "NGF00", "NGG00", "NGH00"]
        );
    }
}
