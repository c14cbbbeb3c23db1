// 🏨 Facility Catalog - id → display name
//
// The catalog is fixed for the process lifetime. Resolution is the single
// data-quality gate of the pipeline: records whose facility id has no
// catalog entry never make it past this stage.

use crate::config::FacilityEntry;
use crate::records::{CostRecord, RawCostRecord};
use std::collections::HashMap;

// ============================================================================
// FACILITY CATALOG
// ============================================================================

/// Immutable facility registry, insertion-ordered
#[derive(Debug, Clone, Default)]
pub struct FacilityCatalog {
    entries: Vec<FacilityEntry>,
    index: HashMap<String, usize>,
}

impl FacilityCatalog {
    /// Build from config entries. A repeated id keeps its first name.
    pub fn from_entries(entries: &[FacilityEntry]) -> Self {
        let mut catalog = FacilityCatalog::default();

        for entry in entries {
            if catalog.index.contains_key(&entry.id) {
                tracing::warn!(facility_id = %entry.id, "duplicate catalog id ignored");
                continue;
            }
            catalog.index.insert(entry.id.clone(), catalog.entries.len());
            catalog.entries.push(entry.clone());
        }

        catalog
    }

    pub fn name_of(&self, facility_id: &str) -> Option<&str> {
        self.index
            .get(facility_id)
            .map(|&i| self.entries[i].name.as_str())
    }

    pub fn contains(&self, facility_id: &str) -> bool {
        self.index.contains_key(facility_id)
    }

    /// Facility ids in catalog order
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn entries(&self) -> &[FacilityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Attach facility names; records with an unknown facility id are dropped.
pub fn resolve_names(records: Vec<RawCostRecord>, catalog: &FacilityCatalog) -> Vec<CostRecord> {
    let input = records.len();

    let resolved: Vec<CostRecord> = records
        .into_iter()
        .filter_map(|raw| {
            let name = catalog.name_of(&raw.facility_id)?.to_string();
            Some(raw.resolve(name))
        })
        .collect();

    let dropped = input - resolved.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = resolved.len(), "records without catalog entry excluded");
    }

    resolved
}
