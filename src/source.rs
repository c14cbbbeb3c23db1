// 📥 Record Sources - external CSV + synthetic batch → unified table
//
// Same shape as a parser framework: one small trait, one impl per source,
// and a loader that stitches them together. External records come first,
// synthetic records are appended, nothing is de-duplicated.

use crate::catalog::{resolve_names, FacilityCatalog};
use crate::config::{delimiter_byte, AnalyticsConfig, SyntheticConfig};
use crate::records::{
    coerce_age, coerce_stay, normalize_facility_id, parse_locale_amount, CostRecord,
    RawCostRecord, Sex,
};
use crate::synthetic;
use anyhow::{Context, Result};
use csv::ByteRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    ExternalFile,
    Synthetic,
}

impl SourceKind {
    pub fn name(&self) -> &str {
        match self {
            SourceKind::ExternalFile => "External file",
            SourceKind::Synthetic => "Synthetic",
        }
    }
}

/// RecordSource - anything that can produce raw cost records
pub trait RecordSource {
    fn load(&self) -> Result<Vec<RawCostRecord>>;

    fn kind(&self) -> SourceKind;
}

// ============================================================================
// EXTERNAL CSV
// ============================================================================

/// Columns of the external file. Each has a plain name and the SIH/DATASUS name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    FacilityId,
    TotalValue,
    Clinic,
    Period,
    Sex,
    Age,
    LengthOfStay,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::FacilityId,
        Column::TotalValue,
        Column::Clinic,
        Column::Period,
        Column::Sex,
        Column::Age,
        Column::LengthOfStay,
    ];

    /// (plain name, SIH name)
    fn names(self) -> (&'static str, &'static str) {
        match self {
            Column::FacilityId => ("facility_id", "CNES"),
            Column::TotalValue => ("total_value", "VAL_TOT"),
            Column::Clinic => ("clinic", "CLINICA"),
            Column::Period => ("period", "MES_ANO"),
            Column::Sex => ("sex", "SEXO"),
            Column::Age => ("age", "IDADE"),
            Column::LengthOfStay => ("length_of_stay", "DIAS_PERM"),
        }
    }
}

/// Header name → column position. When a file carries both names for one
/// column the plain name wins and the other is ignored.
#[derive(Debug, Default)]
struct ColumnMap {
    positions: [Option<usize>; 7],
}

impl ColumnMap {
    fn from_headers(headers: &ByteRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|h| decode_field(h).trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let mut map = ColumnMap::default();
        for column in Column::ALL {
            let (plain, sih) = column.names();
            map.positions[column as usize] = find(plain).or_else(|| find(sih));
        }
        map
    }

    fn has(&self, column: Column) -> bool {
        self.positions[column as usize].is_some()
    }

    /// Trimmed text of one field; empty when the column or the field is missing
    fn text(&self, record: &ByteRecord, column: Column) -> String {
        self.positions[column as usize]
            .and_then(|i| record.get(i))
            .map(|bytes| decode_field(bytes).trim().to_string())
            .unwrap_or_default()
    }

    fn to_raw(&self, record: &ByteRecord, line: usize) -> RawCostRecord {
        let value_text = self.text(record, Column::TotalValue);
        let total_value = parse_locale_amount(&value_text).unwrap_or_else(|| {
            tracing::debug!(line, value = %value_text, "unparseable amount coerced to zero");
            0.0
        });

        RawCostRecord {
            facility_id: normalize_facility_id(&self.text(record, Column::FacilityId)),
            total_value,
            clinic: self.text(record, Column::Clinic),
            period: self.text(record, Column::Period),
            sex: Sex::parse(&self.text(record, Column::Sex)),
            age: coerce_age(&self.text(record, Column::Age)),
            length_of_stay: coerce_stay(&self.text(record, Column::LengthOfStay)),
        }
    }
}

/// UTF-8 when valid, otherwise Latin-1 (the usual DATASUS export encoding)
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Delimited cost file on disk
pub struct CsvFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvFileSource {
    pub fn new(path: &Path, delimiter: u8) -> Self {
        CsvFileSource {
            path: path.to_path_buf(),
            delimiter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvFileSource {
    fn load(&self) -> Result<Vec<RawCostRecord>> {
        use csv::ReaderBuilder;
        use std::fs::File;

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .byte_headers()
            .with_context(|| format!("Failed to read header of {}", self.path.display()))?;
        let columns = ColumnMap::from_headers(headers);

        if !columns.has(Column::FacilityId) {
            tracing::warn!(path = %self.path.display(), "no facility id column, every row will be excluded");
        }

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (line_num, result) in reader.byte_records().enumerate() {
            // +2 because: 1-indexed + header row
            let line = line_num + 2;

            match result {
                Ok(record) => records.push(columns.to_raw(&record, line)),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(line, error = %e, "skipping unreadable row");
                }
            }
        }

        tracing::info!(
            path = %self.path.display(),
            loaded = records.len(),
            skipped,
            "external cost file loaded"
        );

        Ok(records)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ExternalFile
    }
}

// ============================================================================
// SYNTHETIC
// ============================================================================

pub struct SyntheticSource {
    config: SyntheticConfig,
    facility_ids: Vec<String>,
}

impl SyntheticSource {
    pub fn new(config: &SyntheticConfig, catalog: &FacilityCatalog) -> Self {
        SyntheticSource {
            config: config.clone(),
            facility_ids: catalog.ids().into_iter().map(String::from).collect(),
        }
    }
}

impl RecordSource for SyntheticSource {
    fn load(&self) -> Result<Vec<RawCostRecord>> {
        let ids: Vec<&str> = self.facility_ids.iter().map(String::as_str).collect();
        let records = synthetic::generate(&self.config, &ids);

        tracing::debug!(count = records.len(), seed = self.config.seed, "synthetic batch generated");

        Ok(records)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }
}

// ============================================================================
// UNIFIED LOAD
// ============================================================================

/// External records (when the file exists) followed by the synthetic batch
pub fn load_unified_records(config: &AnalyticsConfig) -> Result<Vec<RawCostRecord>> {
    config.validate().context("Invalid configuration")?;

    let catalog = config.catalog();
    let mut sources: Vec<Box<dyn RecordSource>> = Vec::new();

    if config.data_path.exists() {
        sources.push(Box::new(CsvFileSource::new(
            &config.data_path,
            delimiter_byte(config.delimiter)?,
        )));
    } else {
        tracing::info!(
            path = %config.data_path.display(),
            "external cost file not found, using synthetic data only"
        );
    }

    sources.push(Box::new(SyntheticSource::new(&config.synthetic, &catalog)));

    let mut unified = Vec::new();
    for source in &sources {
        let batch = source
            .load()
            .with_context(|| format!("Failed to load {} source", source.kind().name()))?;
        unified.extend(batch);
    }

    Ok(unified)
}

/// Load, then resolve facility names: the table every view is built from
pub fn load_table(config: &AnalyticsConfig) -> Result<Vec<CostRecord>> {
    let raw = load_unified_records(config)?;
    let table = resolve_names(raw, &config.catalog());

    tracing::info!(records = table.len(), "unified table ready");

    Ok(table)
}
