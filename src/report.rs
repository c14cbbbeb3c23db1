// 📋 Dashboard Report - everything one screen needs, computed in one pass
//
// Built fresh from (table, selection, period A, period B) on every change.
// Contains only plain data so the CLI, the TUI and the JSON API can all
// render the same thing.

use crate::aggregation::{clinic_mix, hierarchy, stacked, HierarchyNode, MixEntry, StackedSegment};
use crate::comparison::{compare_periods, format_currency, PeriodComparison};
use crate::filter::{slice_by_period, Selection};
use crate::records::CostRecord;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Age × cost point, sized by length of stay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub age: u32,
    pub value: f64,
    pub facility: String,
    pub clinic: String,
    pub length_of_stay: u32,
}

/// One row of the audit table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub facility: String,
    pub clinic: String,
    pub value: f64,
    pub age: u32,
    pub sex: Option<String>,
    pub length_of_stay: u32,
}

impl From<&CostRecord> for DetailRow {
    fn from(record: &CostRecord) -> Self {
        DetailRow {
            facility: record.facility_name.clone(),
            clinic: record.clinic.clone(),
            value: record.total_value,
            age: record.age,
            sex: record.sex.map(|s| s.code().to_string()),
            length_of_stay: record.length_of_stay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub period_a: String,
    pub period_b: String,
    pub selection: Selection,
    pub comparison: PeriodComparison,
    pub clinic_mix_a: Vec<MixEntry>,
    pub clinic_mix_b: Vec<MixEntry>,
    /// Views below describe period B; empty when B has no records
    pub hierarchy: Vec<HierarchyNode>,
    pub stacked: Vec<StackedSegment>,
    pub scatter: Vec<ScatterPoint>,
    /// Sorted by value, highest first
    pub detail: Vec<DetailRow>,
}

impl DashboardReport {
    pub fn build(
        records: &[CostRecord],
        selection: &Selection,
        period_a: &str,
        period_b: &str,
        network_label: &str,
    ) -> Self {
        let filtered = selection.apply(records);
        let slice_a = slice_by_period(&filtered, period_a);
        let slice_b = slice_by_period(&filtered, period_b);

        let tree = if slice_b.is_empty() {
            Vec::new()
        } else {
            hierarchy(&slice_b, network_label)
        };

        let scatter = slice_b
            .iter()
            .map(|r| ScatterPoint {
                age: r.age,
                value: r.total_value,
                facility: r.facility_name.clone(),
                clinic: r.clinic.clone(),
                length_of_stay: r.length_of_stay,
            })
            .collect();

        let mut detail: Vec<DetailRow> = slice_b.iter().map(DetailRow::from).collect();
        detail.sort_by(|a, b| b.value.total_cmp(&a.value));

        DashboardReport {
            period_a: period_a.to_string(),
            period_b: period_b.to_string(),
            selection: selection.clone(),
            comparison: compare_periods(&filtered, period_a, period_b),
            clinic_mix_a: clinic_mix(&slice_a),
            clinic_mix_b: clinic_mix(&slice_b),
            hierarchy: tree,
            stacked: stacked(&slice_b),
            scatter,
            detail,
        }
    }

    pub fn has_period_b_data(&self) -> bool {
        !self.detail.is_empty()
    }

    /// Plain-text rendering for the CLI
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Closing comparison: {} vs {}", self.period_a, self.period_b);
        let _ = writeln!(out, "{}", "─".repeat(60));

        match &self.comparison {
            PeriodComparison::Ready { result, .. } => {
                let _ = writeln!(
                    out,
                    "Spend in {:<10} {:>20}  ({:+.1}%)",
                    self.period_b,
                    format_currency(result.total_b),
                    result.percent_delta
                );
                let _ = writeln!(
                    out,
                    "Admissions (B)    {:>20}  ({:+} pat.)",
                    result.count_b, result.count_delta
                );
                if let Some(mean) = result.mean_b {
                    let _ = writeln!(out, "Average ticket (B){:>20}", format_currency(mean));
                }
                if let Some(stay) = result.mean_stay_b {
                    let _ = writeln!(out, "Average stay (B)  {:>15.1} days", stay);
                }
            }
            PeriodComparison::NoData { .. } => {
                let _ = writeln!(out, "{}", self.comparison.summary());
            }
        }

        for (label, mix) in [(&self.period_a, &self.clinic_mix_a), (&self.period_b, &self.clinic_mix_b)] {
            if mix.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\nCost mix {}", label);
            for entry in mix {
                let _ = writeln!(
                    out,
                    "  {:<14} {:>18} {:>6.1}%",
                    entry.label,
                    format_currency(entry.value),
                    entry.share_percent
                );
            }
        }

        if self.has_period_b_data() {
            let _ = writeln!(out, "\nFacility > specialty ({})", self.period_b);
            for node in self.hierarchy.iter().skip(1) {
                let indent = "  ".repeat(node.depth as usize);
                let _ = writeln!(
                    out,
                    "{}{:<28} {:>18} {:>6.1}%",
                    indent,
                    node.label,
                    format_currency(node.value),
                    node.percent_of_parent
                );
            }
        } else {
            let _ = writeln!(out, "\nNo records for {} under the current filters.", self.period_b);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<CostRecord> {
        vec![
            CostRecord::new("1", "Hospital A", "UTI Adulto", "2024-01", 1000.0),
            CostRecord::new("1", "Hospital A", "UTI Adulto", "2024-02", 3000.0).with_age(70),
            CostRecord::new("2", "Hospital B", "Médica", "2024-02", 500.0).with_age(30),
            CostRecord::new("2", "Hospital B", "Pediatria", "2024-02", 8000.0).with_age(5),
        ]
    }

    #[test]
    fn test_build_full_report() {
        let records = table();
        let selection = Selection::everything(&records);

        let report = DashboardReport::build(&records, &selection, "2024-01", "2024-02", "Rede");

        assert!(report.comparison.is_ready());
        let result = report.comparison.result().unwrap();
        assert_eq!(result.total_b, 11500.0);
        assert_eq!(result.count_delta, 2);

        assert_eq!(report.clinic_mix_a.len(), 1);
        assert_eq!(report.clinic_mix_b.len(), 3);
        assert_eq!(report.hierarchy[0].value, 11500.0);
        assert_eq!(report.stacked.len(), 3);
        assert_eq!(report.scatter.len(), 3);

        let values: Vec<f64> = report.detail.iter().map(|d| d.value).collect();
        assert_eq!(values, vec![8000.0, 3000.0, 500.0], "audit table sorted by value desc");

        println!("{}", report.render_text());
    }

    #[test]
    fn test_filter_applies_to_every_view() {
        let records = table();
        let selection = Selection::new(["Hospital B"], ["Médica", "Pediatria", "UTI Adulto"]);

        let report = DashboardReport::build(&records, &selection, "2024-01", "2024-02", "Rede");

        assert!(!report.comparison.is_ready(), "Hospital B has nothing in 2024-01");
        assert!(report.clinic_mix_a.is_empty());
        assert!(report.detail.iter().all(|d| d.facility == "Hospital B"));
        assert!(report.stacked.iter().all(|s| s.facility == "Hospital B"));
    }

    #[test]
    fn test_empty_period_b_gives_empty_views() {
        let records = table();
        let selection = Selection::everything(&records);

        let report = DashboardReport::build(&records, &selection, "2024-01", "2099-01", "Rede");

        assert!(!report.has_period_b_data());
        assert!(report.hierarchy.is_empty());
        assert!(report.stacked.is_empty());
        assert!(report.scatter.is_empty());
        assert!(report.render_text().contains("No records for 2099-01"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let records = table();
        let selection = Selection::everything(&records);
        let report = DashboardReport::build(&records, &selection, "2024-01", "2024-02", "Rede");

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["comparison"]["status"], "ready");
        assert_eq!(json["period_b"], "2024-02");
    }
}
