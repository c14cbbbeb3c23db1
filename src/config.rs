// ⚙️ Configuration - defaults → JSON file → environment
//
// Everything the pipeline needs to know that is not data: where the external
// file lives, the facility catalog, how the synthetic batch is drawn, and
// where the fetch utility downloads from.

use crate::catalog::FacilityCatalog;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Env var pointing at an optional JSON config file
pub const CONFIG_PATH_ENV: &str = "COST_ANALYTICS_CONFIG";
pub const DATA_PATH_ENV: &str = "COST_ANALYTICS_DATA";
pub const SEED_ENV: &str = "COST_ANALYTICS_SEED";
pub const FETCH_URL_ENV: &str = "COST_ANALYTICS_FETCH_URL";
pub const FETCH_OUTPUT_ENV: &str = "COST_ANALYTICS_FETCH_OUTPUT";

// ============================================================================
// CONFIG TYPES
// ============================================================================

/// One catalog entry: facility id (CNES code) → display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityEntry {
    pub id: String,
    pub name: String,
}

impl FacilityEntry {
    pub fn new(id: &str, name: &str) -> Self {
        FacilityEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Parameters of the deterministic synthetic batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub record_count: usize,
    pub seed: u64,
    pub years: Vec<i32>,
    pub clinics: Vec<String>,
    /// Uniform value range [value_min, value_max)
    pub value_min: f64,
    pub value_max: f64,
    /// Ages drawn from [0, age_max)
    pub age_max: u32,
    /// Stays drawn from [stay_min, stay_max)
    pub stay_min: u32,
    pub stay_max: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            record_count: 2000,
            seed: 42,
            years: vec![2024, 2025],
            clinics: vec![
                "Cirúrgica".to_string(),
                "Médica".to_string(),
                "UTI Adulto".to_string(),
                "Pediatria".to_string(),
                "Obstetrícia".to_string(),
            ],
            value_min: 2500.0,
            value_max: 45000.0,
            age_max: 99,
            stay_min: 1,
            stay_max: 28,
        }
    }
}

/// Settings for the one-shot health-unit registry download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub url: String,
    pub output_path: PathBuf,
    pub user_agent: String,
    /// Delimiter of the downloaded file; output is always comma-delimited
    pub input_delimiter: char,
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            url: "https://pms-dados-abertos.s3.sa-east-1.amazonaws.com/dados_abertos/unidades_saude.csv"
                .to_string(),
            output_path: PathBuf::from("data/unidades_saude.csv"),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            input_delimiter: ';',
            accept_invalid_certs: false,
            timeout_secs: 30,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Optional external cost file; synthetic data only when absent
    pub data_path: PathBuf,
    pub delimiter: char,
    pub facilities: Vec<FacilityEntry>,
    pub synthetic: SyntheticConfig,
    /// Root label of the hierarchical view
    pub network_label: String,
    pub fetch: FetchConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            data_path: PathBuf::from("data/custos_hospitalares_CE_2024.csv"),
            delimiter: ',',
            facilities: vec![
                FacilityEntry::new("2480666", "Hospital São Vicente"),
                FacilityEntry::new("2345053", "Hospital do Coração"),
                FacilityEntry::new("2480682", "Hospital Santo Antônio"),
            ],
            synthetic: SyntheticConfig::default(),
            network_label: "Rede Barbalha".to_string(),
            fetch: FetchConfig::default(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl AnalyticsConfig {
    /// Load defaults, then `$COST_ANALYTICS_CONFIG` (if set), then env overrides.
    ///
    /// A `.env` file in the working directory is honored.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_json_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(
            data_path = %config.data_path.display(),
            facilities = config.facilities.len(),
            seed = config.synthetic.seed,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply environment overrides through `lookup` (injectable for tests)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATA_PATH_ENV) {
            self.data_path = PathBuf::from(path);
        }

        if let Some(seed) = lookup(SEED_ENV) {
            self.synthetic.seed = seed
                .trim()
                .parse()
                .with_context(|| format!("{} must be an unsigned integer, got '{}'", SEED_ENV, seed))?;
        }

        if let Some(url) = lookup(FETCH_URL_ENV) {
            self.fetch.url = url;
        }

        if let Some(path) = lookup(FETCH_OUTPUT_ENV) {
            self.fetch.output_path = PathBuf::from(path);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.synthetic;

        if s.years.is_empty() {
            bail!("synthetic.years must not be empty");
        }
        if s.clinics.is_empty() {
            bail!("synthetic.clinics must not be empty");
        }
        if !(s.value_min >= 0.0 && s.value_min < s.value_max && s.value_max.is_finite()) {
            bail!(
                "synthetic value range must satisfy 0 <= min < max (got {} .. {})",
                s.value_min,
                s.value_max
            );
        }
        if s.age_max == 0 || s.age_max > 120 {
            bail!("synthetic.age_max must be in 1..=120 (got {})", s.age_max);
        }
        if s.stay_min < 1 || s.stay_min >= s.stay_max {
            bail!(
                "synthetic stay range must satisfy 1 <= min < max (got {} .. {})",
                s.stay_min,
                s.stay_max
            );
        }
        if s.record_count > 0 && self.facilities.is_empty() {
            bail!("facility catalog must not be empty when generating synthetic records");
        }

        delimiter_byte(self.delimiter)?;
        delimiter_byte(self.fetch.input_delimiter)?;

        Ok(())
    }

    /// Build the immutable facility catalog
    pub fn catalog(&self) -> FacilityCatalog {
        FacilityCatalog::from_entries(&self.facilities)
    }
}

/// CSV delimiters must be single ASCII bytes
pub fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        bail!("delimiter must be an ASCII character, got '{}'", c)
    }
}
