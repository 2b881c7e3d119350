//! Best-by date rule and processing date expressions
//!
//! The best-by date is the processing date plus the product's shelf life,
//! rounded to the nearer of the 1st or the 15th of the month it lands in.

use chrono::{Datelike, Days, Local, NaiveDate};
use crate::error::{Error, Result};

/// Label text placed in front of the formatted best-by date
pub const BEST_BY_PREFIX: &str = "Best if Used By:";

/// Longest shelf life a product may be configured with (ten years)
pub const MAX_SHELF_LIFE_DAYS: u32 = 3650;

/// Processing date expression types
#[derive(Debug, Clone, PartialEq)]
pub enum DateExpression {
    /// Use today's date
    Today,
    /// Use an explicit date
    Explicit(NaiveDate),
}

/// Parse a processing date expression
///
/// Supported formats:
/// - `""` (empty) or `"today"` → Today
/// - `"2024-11-20"` → Explicit date (ISO format)
/// - `"11/20/2024"` → Explicit date (US format)
pub fn parse_date_expression(expr: &str) -> Result<DateExpression> {
    let expr = expr.trim();

    if expr.is_empty() || expr.eq_ignore_ascii_case("today") {
        return Ok(DateExpression::Today);
    }

    // ISO format: 2024-11-20
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        return Ok(DateExpression::Explicit(date));
    }

    // US format: 11/20/2024
    if let Ok(date) = NaiveDate::parse_from_str(expr, "%m/%d/%Y") {
        return Ok(DateExpression::Explicit(date));
    }

    Err(Error::InvalidDateExpression(format!("Unable to parse date expression: {}", expr)))
}

/// Resolve a DateExpression to a calendar date
pub fn resolve_date(expr: &DateExpression) -> NaiveDate {
    match expr {
        DateExpression::Today => Local::now().date_naive(),
        DateExpression::Explicit(date) => *date,
    }
}

/// Check a shelf life given on the command line or in the configuration
pub fn check_shelf_life(shelf_life_days: u32) -> Result<()> {
    if shelf_life_days == 0 {
        return Err(Error::Config("shelf life must be positive".to_string()));
    }
    if shelf_life_days > MAX_SHELF_LIFE_DAYS {
        return Err(Error::Config(format!(
            "shelf life of {} days exceeds the maximum of {}",
            shelf_life_days, MAX_SHELF_LIFE_DAYS
        )));
    }
    Ok(())
}

/// Compute the best-by date for a product processed on `today`
///
/// `today + shelf_life_days` is rounded to the 1st or the 15th of its own
/// month, whichever is closer. An exact tie (the 8th) goes to the 1st.
/// Fails when the sum leaves chrono's calendar.
pub fn compute_best_by(today: NaiveDate, shelf_life_days: u32) -> Result<NaiveDate> {
    let target = today
        .checked_add_days(Days::new(u64::from(shelf_life_days)))
        .ok_or_else(|| {
            Error::DateOutOfRange(format!("{} plus {} days", today, shelf_life_days))
        })?;

    // Every month has a 1st and a 15th
    let first = target.with_day(1).unwrap_or(target);
    let fifteenth = target.with_day(15).unwrap_or(target);

    let dist_first = (target - first).num_days().abs();
    let dist_fifteenth = (target - fifteenth).num_days().abs();

    if dist_first <= dist_fifteenth {
        Ok(first)
    } else {
        Ok(fifteenth)
    }
}

/// Format a best-by date as `MM/DD/YYYY`
pub fn format_best_by(date: &NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Full replacement label text, e.g. `Best if Used By: 03/15/2024`
pub fn best_by_label(date: &NaiveDate) -> String {
    format!("{} {}", BEST_BY_PREFIX, format_best_by(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_today() {
        assert_eq!(parse_date_expression("").unwrap(), DateExpression::Today);
        assert_eq!(parse_date_expression("  ").unwrap(), DateExpression::Today);
        assert_eq!(parse_date_expression("today").unwrap(), DateExpression::Today);
        assert_eq!(parse_date_expression("TODAY").unwrap(), DateExpression::Today);
    }

    #[test]
    fn test_parse_explicit_dates() {
        assert_eq!(
            parse_date_expression("2024-01-01").unwrap(),
            DateExpression::Explicit(ymd(2024, 1, 1))
        );
        assert_eq!(
            parse_date_expression("11/20/2024").unwrap(),
            DateExpression::Explicit(ymd(2024, 11, 20))
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_date_expression("Tuesday").is_err());
        assert!(parse_date_expression("2024-13-01").is_err());
        assert!(parse_date_expression("02/30/2024").is_err());
    }

    #[test]
    fn test_resolve_today() {
        let resolved = resolve_date(&DateExpression::Today);
        assert_eq!(resolved, Local::now().date_naive());
    }

    #[test]
    fn test_best_by_documented_scenario() {
        // 2024-01-01 + 75 days = 2024-03-16, one day from the 15th
        let best_by = compute_best_by(ymd(2024, 1, 1), 75).unwrap();
        assert_eq!(best_by, ymd(2024, 3, 15));
        assert_eq!(format_best_by(&best_by), "03/15/2024");
        assert_eq!(best_by_label(&best_by), "Best if Used By: 03/15/2024");
    }

    #[test]
    fn test_best_by_tie_on_the_eighth_goes_to_first() {
        let best_by = compute_best_by(ymd(2024, 5, 1), 7).unwrap();
        assert_eq!(best_by, ymd(2024, 5, 1));
    }

    #[test]
    fn test_best_by_rounds_around_the_midpoint() {
        // 7th → 1st, 9th → 15th
        assert_eq!(compute_best_by(ymd(2024, 5, 1), 6).unwrap(), ymd(2024, 5, 1));
        assert_eq!(compute_best_by(ymd(2024, 5, 1), 8).unwrap(), ymd(2024, 5, 15));
    }

    #[test]
    fn test_best_by_uses_landing_month() {
        // 2024-01-20 + 10 = 2024-01-30 → 15th of January
        assert_eq!(compute_best_by(ymd(2024, 1, 20), 10).unwrap(), ymd(2024, 1, 15));
        // 2024-01-20 + 40 = 2024-02-29 → 15th of February, not January
        assert_eq!(compute_best_by(ymd(2024, 1, 20), 40).unwrap(), ymd(2024, 2, 15));
        // 2023-12-20 + 12 = 2024-01-01 → crosses the year boundary
        assert_eq!(compute_best_by(ymd(2023, 12, 20), 12).unwrap(), ymd(2024, 1, 1));
    }

    #[test]
    fn test_best_by_zero_shelf_life() {
        assert_eq!(compute_best_by(ymd(2024, 6, 15), 0).unwrap(), ymd(2024, 6, 15));
        assert_eq!(compute_best_by(ymd(2024, 6, 3), 0).unwrap(), ymd(2024, 6, 1));
    }

    #[test]
    fn test_best_by_only_produces_first_or_fifteenth() {
        let start = ymd(2023, 1, 1);
        for offset in 0..800 {
            let today = start + Duration::days(offset);
            for shelf_life in [0u32, 1, 7, 30, 60, 75, 365] {
                let target = today + Duration::days(i64::from(shelf_life));
                let best_by = compute_best_by(today, shelf_life).unwrap();

                assert!(best_by.day() == 1 || best_by.day() == 15, "{} -> {}", target, best_by);
                assert_eq!(best_by.month(), target.month());
                assert_eq!(best_by.year(), target.year());

                // The chosen candidate is never farther away than the other one
                let other = if best_by.day() == 1 {
                    target.with_day(15).unwrap()
                } else {
                    target.with_day(1).unwrap()
                };
                let chosen = (target - best_by).num_days().abs();
                let rejected = (target - other).num_days().abs();
                assert!(chosen <= rejected);
            }
        }
    }

    #[test]
    fn test_best_by_past_the_calendar_is_an_error() {
        let err = compute_best_by(ymd(2024, 1, 1), 4_000_000_000).unwrap_err();
        assert!(matches!(err, Error::DateOutOfRange(_)));
        assert!(err.is_configuration());

        let err = compute_best_by(NaiveDate::MAX, 1).unwrap_err();
        assert!(matches!(err, Error::DateOutOfRange(_)));
    }

    #[test]
    fn test_check_shelf_life_bounds() {
        assert!(check_shelf_life(1).is_ok());
        assert!(check_shelf_life(MAX_SHELF_LIFE_DAYS).is_ok());
        assert!(check_shelf_life(0).unwrap_err().is_configuration());
        assert!(check_shelf_life(MAX_SHELF_LIFE_DAYS + 1).unwrap_err().is_configuration());
        assert!(check_shelf_life(4_000_000_000).is_err());

        // The largest allowed shelf life stays well inside the calendar
        assert!(compute_best_by(ymd(2024, 1, 1), MAX_SHELF_LIFE_DAYS).is_ok());
    }

    #[test]
    fn test_format_zero_pads() {
        assert_eq!(format_best_by(&ymd(2026, 1, 1)), "01/01/2026");
        assert_eq!(format_best_by(&ymd(2026, 11, 15)), "11/15/2026");
    }
}
