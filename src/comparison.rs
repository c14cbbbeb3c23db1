// ⚖️ Comparison Calculator - period A vs period B
//
//   percent_delta = (total_b - total_a) / total_a * 100   when total_a > 0
//                 = 0                                      when total_a == 0
//
// The zero case is a display policy, not "no change": callers that care
// must look at total_a themselves.

use crate::filter::slice_by_period;
use crate::records::CostRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// COMPARISON RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub total_a: f64,
    pub total_b: f64,
    pub percent_delta: f64,
    pub count_a: usize,
    pub count_b: usize,
    /// count_b - count_a, may be negative
    pub count_delta: i64,
    /// Mean value per record in B; None when B is empty
    pub mean_b: Option<f64>,
    /// Mean length of stay in B; None when B is empty
    pub mean_stay_b: Option<f64>,
}

/// Compare two slices taken from the same filtered base.
///
/// Never fails. Mean metrics are `None` for an empty slice B, so callers
/// should check emptiness first (see [`compare_periods`]).
pub fn compare(slice_a: &[CostRecord], slice_b: &[CostRecord]) -> ComparisonResult {
    let total_a = total_value(slice_a);
    let total_b = total_value(slice_b);

    let count_a = slice_a.len();
    let count_b = slice_b.len();

    let mean_b = (count_b > 0).then(|| total_b / count_b as f64);
    let mean_stay_b = (count_b > 0).then(|| {
        slice_b.iter().map(|r| r.length_of_stay as f64).sum::<f64>() / count_b as f64
    });

    ComparisonResult {
        total_a,
        total_b,
        percent_delta: percent_delta(total_a, total_b),
        count_a,
        count_b,
        count_delta: count_b as i64 - count_a as i64,
        mean_b,
        mean_stay_b,
    }
}

pub fn percent_delta(total_a: f64, total_b: f64) -> f64 {
    if total_a > 0.0 {
        (total_b - total_a) / total_a * 100.0
    } else {
        0.0
    }
}

pub fn total_value(records: &[CostRecord]) -> f64 {
    records.iter().map(|r| r.total_value).sum()
}

// ============================================================================
// PERIOD COMPARISON (with explicit "no data" outcome)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeriodComparison {
    /// Both slices have records
    Ready {
        period_a: String,
        period_b: String,
        result: ComparisonResult,
    },

    /// At least one slice is empty under the current filter
    NoData {
        period_a: String,
        period_b: String,
        empty_periods: Vec<String>,
    },
}

impl PeriodComparison {
    pub fn is_ready(&self) -> bool {
        matches!(self, PeriodComparison::Ready { .. })
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            PeriodComparison::Ready { result, .. } => Some(result),
            PeriodComparison::NoData { .. } => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            PeriodComparison::Ready {
                period_a,
                period_b,
                result,
            } => format!(
                "{} vs {}: spend {} ({:+.1}%), admissions {} ({:+} pat.), average ticket {}, average stay {:.1} days",
                period_a,
                period_b,
                format_currency(result.total_b),
                result.percent_delta,
                result.count_b,
                result.count_delta,
                result.mean_b.map(format_currency).unwrap_or_else(|| "-".to_string()),
                result.mean_stay_b.unwrap_or(0.0),
            ),
            PeriodComparison::NoData {
                period_a,
                period_b,
                empty_periods,
            } => format!(
                "{} vs {}: no data for {} under the current filters",
                period_a,
                period_b,
                empty_periods.join(", ")
            ),
        }
    }
}

/// Slice the filtered table by both periods and compare, or report which are empty
pub fn compare_periods(filtered: &[CostRecord], period_a: &str, period_b: &str) -> PeriodComparison {
    let slice_a = slice_by_period(filtered, period_a);
    let slice_b = slice_by_period(filtered, period_b);

    let mut empty_periods = Vec::new();
    if slice_a.is_empty() {
        empty_periods.push(period_a.to_string());
    }
    if slice_b.is_empty() && period_b != period_a {
        empty_periods.push(period_b.to_string());
    }

    if !empty_periods.is_empty() {
        tracing::debug!(?empty_periods, "comparison has empty slices");
        return PeriodComparison::NoData {
            period_a: period_a.to_string(),
            period_b: period_b.to_string(),
            empty_periods,
        };
    }

    PeriodComparison::Ready {
        period_a: period_a.to_string(),
        period_b: period_b.to_string(),
        result: compare(&slice_a, &slice_b),
    }
}

/// `R$ 1,234.56`
pub fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}R$ {}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: &str, value: f64, stay: u32) -> CostRecord {
        CostRecord::new("A", "Hospital A", "UTI", period, value).with_stay(stay)
    }

    #[test]
    fn test_two_month_scenario() {
        let records = vec![record("2024-01", 1000.0, 2), record("2024-02", 3000.0, 5)];

        let result = compare(
            &slice_by_period(&records, "2024-01"),
            &slice_by_period(&records, "2024-02"),
        );

        assert_eq!(result.total_a, 1000.0);
        assert_eq!(result.total_b, 3000.0);
        assert_eq!(result.percent_delta, 200.0);
        assert_eq!(result.count_delta, 0);
        assert_eq!(result.mean_b, Some(3000.0));
        assert_eq!(result.mean_stay_b, Some(5.0));
    }

    #[test]
    fn test_zero_base_gives_zero_delta() {
        let a = vec![record("2024-01", 0.0, 1)];
        let b = vec![record("2024-02", 9999.0, 1)];

        assert_eq!(compare(&a, &b).percent_delta, 0.0);
        assert_eq!(compare(&[], &b).percent_delta, 0.0);
    }

    #[test]
    fn test_negative_count_delta_and_decrease() {
        let a = vec![record("2024-01", 500.0, 1), record("2024-01", 500.0, 3)];
        let b = vec![record("2024-02", 250.0, 4)];

        let result = compare(&a, &b);

        assert_eq!(result.count_delta, -1);
        assert_eq!(result.percent_delta, -75.0);
        assert_eq!(result.mean_stay_b, Some(4.0));
    }

    #[test]
    fn test_empty_b_has_no_means() {
        let result = compare(&[record("2024-01", 100.0, 1)], &[]);

        assert_eq!(result.mean_b, None);
        assert_eq!(result.mean_stay_b, None);
        assert_eq!(result.count_delta, -1);
    }

    #[test]
    fn test_compare_periods_reports_empty_slice() {
        let records = vec![record("2024-01", 1000.0, 2)];

        let outcome = compare_periods(&records, "2024-01", "2099-01");

        assert!(!outcome.is_ready());
        assert!(outcome.result().is_none());
        match outcome {
            PeriodComparison::NoData { empty_periods, .. } => {
                assert_eq!(empty_periods, vec!["2099-01".to_string()]);
            }
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[test]
    fn test_compare_periods_ready() {
        let records = vec![record("2024-01", 1000.0, 2), record("2024-02", 3000.0, 5)];

        let outcome = compare_periods(&records, "2024-01", "2024-02");

        assert!(outcome.is_ready());
        assert_eq!(outcome.result().map(|r| r.percent_delta), Some(200.0));
        println!("{}", outcome.summary());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.56), "R$ 1,234.56");
        assert_eq!(format_currency(999.0), "R$ 999.00");
        assert_eq!(format_currency(1234567.891), "R$ 1,234,567.89");
        assert_eq!(format_currency(0.0), "R$ 0.00");
        assert_eq!(format_currency(-50.0), "-R$ 50.00");
    }
}
