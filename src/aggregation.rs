// 📊 Aggregation Views - group-and-sum over dimension tuples
//
// One generic primitive (group_sum) and the views built on it:
//   - clinic mix (share of a slice per clinic)
//   - hierarchy  (network → facility → clinic, with percent of parent)
//   - stacked    (facility × clinic)
//
// Completeness: every input record lands in exactly one group, so the sum
// over all groups equals the sum over all records.

use crate::records::CostRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// DIMENSIONS & MEASURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Facility,
    Clinic,
    Period,
    Sex,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Facility => "facility",
            Dimension::Clinic => "clinic",
            Dimension::Period => "period",
            Dimension::Sex => "sex",
        }
    }

    pub fn parse(text: &str) -> Option<Dimension> {
        match text.trim().to_lowercase().as_str() {
            "facility" | "hospital" => Some(Dimension::Facility),
            "clinic" | "specialty" => Some(Dimension::Clinic),
            "period" | "month" => Some(Dimension::Period),
            "sex" => Some(Dimension::Sex),
            _ => None,
        }
    }

    fn key_of(&self, record: &CostRecord) -> String {
        match self {
            Dimension::Facility => record.facility_name.clone(),
            Dimension::Clinic => record.clinic.clone(),
            Dimension::Period => record.period.clone(),
            Dimension::Sex => record
                .sex
                .map(|s| s.code().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    TotalValue,
    LengthOfStay,
    Count,
}

impl Measure {
    fn value_of(&self, record: &CostRecord) -> f64 {
        match self {
            Measure::TotalValue => record.total_value,
            Measure::LengthOfStay => record.length_of_stay as f64,
            Measure::Count => 1.0,
        }
    }
}

// ============================================================================
// GROUP SUM
// ============================================================================

/// One group: dimension values in the requested order, summed measure, row count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSum {
    pub keys: Vec<String>,
    pub sum: f64,
    pub count: usize,
}

/// Group records by `dimensions` and sum `measure`. Groups come back sorted by key.
///
/// With no dimensions, everything falls into a single group with an empty key.
pub fn group_sum(records: &[CostRecord], dimensions: &[Dimension], measure: Measure) -> Vec<GroupSum> {
    let mut groups: BTreeMap<Vec<String>, (f64, usize)> = BTreeMap::new();

    for record in records {
        let key: Vec<String> = dimensions.iter().map(|d| d.key_of(record)).collect();
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += measure.value_of(record);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(keys, (sum, count))| GroupSum { keys, sum, count })
        .collect()
}

fn share_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// CLINIC MIX
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixEntry {
    pub label: String,
    pub value: f64,
    pub share_percent: f64,
}

/// Cost composition of a slice by clinic
pub fn clinic_mix(records: &[CostRecord]) -> Vec<MixEntry> {
    let groups = group_sum(records, &[Dimension::Clinic], Measure::TotalValue);
    let total: f64 = groups.iter().map(|g| g.sum).sum();

    groups
        .into_iter()
        .map(|g| MixEntry {
            label: g.keys.into_iter().next().unwrap_or_default(),
            value: g.sum,
            share_percent: share_of(g.sum, total),
        })
        .collect()
}

// ============================================================================
// HIERARCHY (network → facility → clinic)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Path from the root, joined with '/'
    pub id: String,
    pub label: String,
    pub parent: Option<String>,
    pub depth: u8,
    pub value: f64,
    pub percent_of_parent: f64,
}

/// Nodes in pre-order: root, then each facility followed by its clinics
pub fn hierarchy(records: &[CostRecord], root_label: &str) -> Vec<HierarchyNode> {
    let leaves = group_sum(records, &[Dimension::Facility, Dimension::Clinic], Measure::TotalValue);
    let facilities = group_sum(records, &[Dimension::Facility], Measure::TotalValue);
    let root_value: f64 = facilities.iter().map(|f| f.sum).sum();

    let mut nodes = vec![HierarchyNode {
        id: root_label.to_string(),
        label: root_label.to_string(),
        parent: None,
        depth: 0,
        value: root_value,
        percent_of_parent: 100.0,
    }];

    for facility in &facilities {
        let name = &facility.keys[0];
        let facility_id = format!("{}/{}", root_label, name);

        nodes.push(HierarchyNode {
            id: facility_id.clone(),
            label: name.clone(),
            parent: Some(root_label.to_string()),
            depth: 1,
            value: facility.sum,
            percent_of_parent: share_of(facility.sum, root_value),
        });

        for leaf in leaves.iter().filter(|l| &l.keys[0] == name) {
            nodes.push(HierarchyNode {
                id: format!("{}/{}", facility_id, leaf.keys[1]),
                label: leaf.keys[1].clone(),
                parent: Some(facility_id.clone()),
                depth: 2,
                value: leaf.sum,
                percent_of_parent: share_of(leaf.sum, facility.sum),
            });
        }
    }

    nodes
}

// ============================================================================
// STACKED (facility × clinic)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedSegment {
    pub facility: String,
    pub clinic: String,
    pub value: f64,
}

pub fn stacked(records: &[CostRecord]) -> Vec<StackedSegment> {
    group_sum(records, &[Dimension::Facility, Dimension::Clinic], Measure::TotalValue)
        .into_iter()
        .map(|g| {
            let mut keys = g.keys.into_iter();
            StackedSegment {
                facility: keys.next().unwrap_or_default(),
                clinic: keys.next().unwrap_or_default(),
                value: g.sum,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Sex;

    fn table() -> Vec<CostRecord> {
        vec![
            CostRecord::new("1", "Hospital A", "UTI Adulto", "2024-01", 1000.0).with_stay(3),
            CostRecord::new("1", "Hospital A", "UTI Adulto", "2024-01", 500.0).with_stay(1),
            CostRecord::new("1", "Hospital A", "Pediatria", "2024-01", 250.0),
            CostRecord::new("2", "Hospital B", "UTI Adulto", "2024-01", 2000.0)
                .with_sex(Sex::Female),
        ]
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_group_sum_completeness() {
        let records = table();
        let total: f64 = records.iter().map(|r| r.total_value).sum();

        for dims in [
            vec![],
            vec![Dimension::Facility],
            vec![Dimension::Clinic],
            vec![Dimension::Facility, Dimension::Clinic],
            vec![Dimension::Clinic, Dimension::Facility, Dimension::Sex],
        ] {
            let groups = group_sum(&records, &dims, Measure::TotalValue);
            let grouped_total: f64 = groups.iter().map(|g| g.sum).sum();
            let grouped_count: usize = groups.iter().map(|g| g.count).sum();

            assert!(approx(grouped_total, total), "dims {:?} lost value", dims);
            assert_eq!(grouped_count, records.len(), "dims {:?} lost rows", dims);
        }
    }

    #[test]
    fn test_group_sum_keys_follow_dimension_order() {
        let groups = group_sum(
            &table(),
            &[Dimension::Facility, Dimension::Clinic],
            Measure::TotalValue,
        );

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].keys, vec!["Hospital A", "Pediatria"]);
        assert_eq!(groups[1].keys, vec!["Hospital A", "UTI Adulto"]);
        assert_eq!(groups[1].sum, 1500.0);
        assert_eq!(groups[1].count, 2);
    }

    #[test]
    fn test_other_measures() {
        let stays = group_sum(&table(), &[Dimension::Facility], Measure::LengthOfStay);
        assert_eq!(stays[0].sum, 5.0);

        let counts = group_sum(&table(), &[Dimension::Sex], Measure::Count);
        assert_eq!(counts.len(), 2, "unset sex groups under an empty key");
    }

    #[test]
    fn test_empty_input_gives_no_groups() {
        assert!(group_sum(&[], &[Dimension::Facility], Measure::TotalValue).is_empty());
        assert!(clinic_mix(&[]).is_empty());
        assert!(stacked(&[]).is_empty());
    }

    #[test]
    fn test_clinic_mix_shares() {
        let mix = clinic_mix(&table());

        assert_eq!(mix.len(), 2);
        let share_total: f64 = mix.iter().map(|m| m.share_percent).sum();
        assert!(approx(share_total, 100.0));
        assert_eq!(mix[1].label, "UTI Adulto");
        assert!(approx(mix[1].share_percent, 3500.0 / 3750.0 * 100.0));
    }

    #[test]
    fn test_hierarchy_structure() {
        let nodes = hierarchy(&table(), "Rede Barbalha");

        assert_eq!(nodes[0].label, "Rede Barbalha");
        assert_eq!(nodes[0].value, 3750.0);
        assert_eq!(nodes.iter().filter(|n| n.depth == 1).count(), 2);
        assert_eq!(nodes.iter().filter(|n| n.depth == 2).count(), 3);

        let hospital_a = nodes.iter().find(|n| n.label == "Hospital A").unwrap();
        assert_eq!(hospital_a.value, 1750.0);
        assert!(approx(hospital_a.percent_of_parent, 1750.0 / 3750.0 * 100.0));

        let leaf_sum: f64 = nodes.iter().filter(|n| n.depth == 2).map(|n| n.value).sum();
        assert!(approx(leaf_sum, nodes[0].value));
    }

    #[test]
    fn test_hierarchy_of_empty_slice_is_root_only() {
        let nodes = hierarchy(&[], "Rede");

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].value, 0.0);
    }

    #[test]
    fn test_stacked_segments() {
        let segments = stacked(&table());

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].facility, "Hospital B");
        assert_eq!(segments[2].clinic, "UTI Adulto");
        assert_eq!(segments[2].value, 2000.0);
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!(Dimension::parse("Hospital"), Some(Dimension::Facility));
        assert_eq!(Dimension::parse("clinic"), Some(Dimension::Clinic));
        assert_eq!(Dimension::parse("unknown"), None);
        assert_eq!(Dimension::Period.name(), "period");
    }
}
