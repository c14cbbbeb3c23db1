// Hospital Cost Analytics - Core Library
// Exposes all modules for use in the CLI, the TUI dashboard, the API server, and tests

pub mod config;
pub mod error;
pub mod records;
pub mod catalog;      // Catalog Resolver - id → name, single data-quality gate
pub mod synthetic;    // Deterministic synthetic batch
pub mod source;       // Record Source - external CSV + synthetic → unified table
pub mod cache;        // Fingerprint-keyed table cache
pub mod filter;       // Filter Engine - selection + period slices
pub mod comparison;   // Comparison Calculator - A vs B metrics
pub mod aggregation;  // Aggregation Views - group_sum, hierarchy, stacked
pub mod report;       // Dashboard Report - one screen's worth of views
pub mod fetch;        // Registry download utility

// Re-export commonly used types
pub use config::{AnalyticsConfig, FacilityEntry, FetchConfig, SyntheticConfig};
pub use error::FetchError;
pub use records::{
    coerce_amount, parse_locale_amount, CostRecord, RawCostRecord, Sex,
};
pub use catalog::{resolve_names, FacilityCatalog};
pub use source::{
    load_table, load_unified_records, CsvFileSource, RecordSource, SourceKind, SyntheticSource,
};
pub use cache::{FileStat, RecordCache, SourceFingerprint};
pub use filter::{
    available_periods, clinic_options, default_periods, facility_options, filter,
    slice_by_period, Selection,
};
pub use comparison::{
    compare, compare_periods, format_currency, ComparisonResult, PeriodComparison,
};
pub use aggregation::{
    clinic_mix, group_sum, hierarchy, stacked, Dimension, GroupSum, HierarchyNode, Measure,
    MixEntry, StackedSegment,
};
pub use report::{DashboardReport, DetailRow, ScatterPoint};
pub use fetch::{fetch_to_file, reencode_delimited, FetchSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber used by the binaries.
///
/// `RUST_LOG` wins; otherwise `default_directive` (e.g. "cost_analytics=info").
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
