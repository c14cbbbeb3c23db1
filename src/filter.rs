// 🔎 Filter Engine - facility/clinic selection, then period slices
//
// Pure functions over the immutable table. Re-run them on every selection
// change; nothing here keeps state between calls.

use crate::records::CostRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ============================================================================
// SELECTION
// ============================================================================

/// The user's current facility and clinic choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub facilities: BTreeSet<String>,
    pub clinics: BTreeSet<String>,
}

impl Selection {
    pub fn new<F, C>(facilities: F, clinics: C) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Selection {
            facilities: facilities.into_iter().map(Into::into).collect(),
            clinics: clinics.into_iter().map(Into::into).collect(),
        }
    }

    /// Every facility and clinic present in the table (the default view)
    pub fn everything(records: &[CostRecord]) -> Self {
        Selection::new(facility_options(records), clinic_options(records))
    }

    pub fn matches(&self, record: &CostRecord) -> bool {
        self.facilities.contains(&record.facility_name) && self.clinics.contains(&record.clinic)
    }

    pub fn apply(&self, records: &[CostRecord]) -> Vec<CostRecord> {
        filter(records, &self.facilities, &self.clinics)
    }

    /// Add the facility if absent, remove it if present
    pub fn toggle_facility(&mut self, name: &str) {
        if !self.facilities.remove(name) {
            self.facilities.insert(name.to_string());
        }
    }

    pub fn toggle_clinic(&mut self, clinic: &str) {
        if !self.clinics.remove(clinic) {
            self.clinics.insert(clinic.to_string());
        }
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Keep records whose facility name AND clinic are both selected
pub fn filter(
    records: &[CostRecord],
    facilities: &BTreeSet<String>,
    clinics: &BTreeSet<String>,
) -> Vec<CostRecord> {
    records
        .iter()
        .filter(|r| facilities.contains(&r.facility_name) && clinics.contains(&r.clinic))
        .cloned()
        .collect()
}

/// Exact match on the `YYYY-MM` key. An empty result is a valid outcome.
pub fn slice_by_period(records: &[CostRecord], period: &str) -> Vec<CostRecord> {
    records
        .iter()
        .filter(|r| r.period == period)
        .cloned()
        .collect()
}

// ============================================================================
// OPTIONS & DEFAULTS
// ============================================================================

/// Distinct periods, most recent first
pub fn available_periods(records: &[CostRecord]) -> Vec<String> {
    let unique: BTreeSet<&str> = records.iter().map(|r| r.period.as_str()).collect();
    unique.into_iter().rev().map(String::from).collect()
}

/// Default comparison pair: A twelve entries back (or the oldest), B the latest.
///
/// With 24 months of data this compares a month with the same month a year earlier.
pub fn default_periods(periods: &[String]) -> Option<(String, String)> {
    let latest = periods.first()?;
    let base = &periods[12.min(periods.len() - 1)];
    Some((base.clone(), latest.clone()))
}

/// Distinct facility names in first-appearance order
pub fn facility_options(records: &[CostRecord]) -> Vec<String> {
    distinct_in_order(records.iter().map(|r| r.facility_name.as_str()))
}

/// Distinct clinics in first-appearance order
pub fn clinic_options(records: &[CostRecord]) -> Vec<String> {
    distinct_in_order(records.iter().map(|r| r.clinic.as_str()))
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(String::from)
        .collect()
}
