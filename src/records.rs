// 🏥 Cost Records - one inpatient billing episode
//
// Two shapes of the same record:
//   RawCostRecord - what the sources produce (facility_id only)
//   CostRecord    - after catalog resolution (facility_name guaranteed)
//
// Only the Catalog Resolver turns the first into the second, so nothing
// downstream can ever see a record without a facility name.

use serde::{Deserialize, Serialize};

// ============================================================================
// SEX
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    /// Accepts `M`/`F` in any case, plus the SIH numeric codes (1 = M, 3 = F)
    pub fn parse(text: &str) -> Option<Sex> {
        match text.trim().to_uppercase().as_str() {
            "M" | "1" => Some(Sex::Male),
            "F" | "3" => Some(Sex::Female),
            _ => None,
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Record as loaded from a source, before catalog resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCostRecord {
    pub facility_id: String,
    pub total_value: f64,
    pub clinic: String,
    /// `YYYY-MM`
    pub period: String,
    pub sex: Option<Sex>,
    pub age: u32,
    pub length_of_stay: u32,
}

impl RawCostRecord {
    /// Attach a resolved facility name. Called by the catalog resolver.
    pub(crate) fn resolve(self, facility_name: String) -> CostRecord {
        CostRecord {
            facility_id: self.facility_id,
            facility_name,
            total_value: self.total_value,
            clinic: self.clinic,
            period: self.period,
            sex: self.sex,
            age: self.age,
            length_of_stay: self.length_of_stay,
        }
    }
}

/// Resolved record - the unit every filter, comparison and view works on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub facility_id: String,
    pub facility_name: String,
    pub total_value: f64,
    pub clinic: String,
    pub period: String,
    pub sex: Option<Sex>,
    pub age: u32,
    pub length_of_stay: u32,
}

impl CostRecord {
    /// Create a record with the fields every view needs.
    /// Stay defaults to one day; age and sex are unset.
    pub fn new(
        facility_id: &str,
        facility_name: &str,
        clinic: &str,
        period: &str,
        total_value: f64,
    ) -> Self {
        CostRecord {
            facility_id: facility_id.to_string(),
            facility_name: facility_name.to_string(),
            total_value,
            clinic: clinic.to_string(),
            period: period.to_string(),
            sex: None,
            age: 0,
            length_of_stay: 1,
        }
    }

    /// Builder pattern: set length of stay
    pub fn with_stay(mut self, days: u32) -> Self {
        self.length_of_stay = days.max(1);
        self
    }

    /// Builder pattern: set age
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    /// Builder pattern: set sex
    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }
}

// ============================================================================
// COERCION - failures degrade to defaults, never to errors
// ============================================================================

pub const MAX_AGE: u32 = 120;

/// Parse a monetary amount written in pt-BR or plain notation.
///
/// `"1.234,56"` → 1234.56, `"2500,5"` → 2500.5, `"R$ 10"` → 10.0.
/// Returns `None` for unparseable, non-finite or negative input.
pub fn parse_locale_amount(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();

    if trimmed.is_empty() {
        return None;
    }

    // Comma present: it is the decimal separator and dots group thousands
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    let value: f64 = normalized.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Monetary coercion: anything unparseable becomes zero
pub fn coerce_amount(text: &str) -> f64 {
    parse_locale_amount(text).unwrap_or(0.0)
}

/// Parse an integer field, accepting float notation with no fraction ("42.0")
pub fn parse_whole_number(text: &str) -> Option<i64> {
    let trimmed = text.trim();

    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }

    let f: f64 = trimmed.replace(',', ".").parse().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Age in [0, 120); anything else becomes 0
pub fn coerce_age(text: &str) -> u32 {
    match parse_whole_number(text) {
        Some(n) if (0..MAX_AGE as i64).contains(&n) => n as u32,
        _ => 0,
    }
}

/// Length of stay in days, at least 1
pub fn coerce_stay(text: &str) -> u32 {
    match parse_whole_number(text) {
        Some(n) if n >= 1 => n.min(u32::MAX as i64) as u32,
        _ => 1,
    }
}

/// Facility ids read from float-typed columns come back as "2480666.0"
pub fn normalize_facility_id(text: &str) -> String {
    let trimmed = text.trim();
    trimmed.strip_suffix(".0").unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_amount_scenarios() {
        assert_eq!(coerce_amount("1.234,56"), 1234.56);
        assert_eq!(coerce_amount("abc"), 0.0);
    }

    #[test]
    fn test_locale_amount_variants() {
        assert_eq!(parse_locale_amount("2500,5"), Some(2500.5));
        assert_eq!(parse_locale_amount("2500.5"), Some(2500.5));
        assert_eq!(parse_locale_amount(" R$ 1.000,00 "), Some(1000.0));
        assert_eq!(parse_locale_amount("45000"), Some(45000.0));
        assert_eq!(parse_locale_amount("1.234.567,89"), Some(1234567.89));
    }

    #[test]
    fn test_locale_amount_rejects_garbage() {
        assert_eq!(parse_locale_amount(""), None);
        assert_eq!(parse_locale_amount("   "), None);
        assert_eq!(parse_locale_amount("NaN"), None);
        assert_eq!(parse_locale_amount("inf"), None);
        assert_eq!(parse_locale_amount("-10,00"), None, "amounts are non-negative");
        assert_eq!(coerce_amount("12,34,56"), 0.0);
    }

    #[test]
    fn test_age_and_stay_coercion() {
        assert_eq!(coerce_age("42"), 42);
        assert_eq!(coerce_age("42.0"), 42);
        assert_eq!(coerce_age("130"), 0);
        assert_eq!(coerce_age("-1"), 0);
        assert_eq!(coerce_age("x"), 0);

        assert_eq!(coerce_stay("7"), 7);
        assert_eq!(coerce_stay("0"), 1);
        assert_eq!(coerce_stay(""), 1);
        assert_eq!(coerce_stay("3.5"), 1);
    }

    #[test]
    fn test_sex_parse() {
        assert_eq!(Sex::parse("m"), Some(Sex::Male));
        assert_eq!(Sex::parse(" F "), Some(Sex::Female));
        assert_eq!(Sex::parse("3"), Some(Sex::Female));
        assert_eq!(Sex::parse("X"), None);
        assert_eq!(Sex::Female.code(), "F");
    }

    #[test]
    fn test_normalize_facility_id() {
        assert_eq!(normalize_facility_id(" 2480666 "), "2480666");
        assert_eq!(normalize_facility_id("2480666.0"), "2480666");
        assert_eq!(normalize_facility_id("ABC"), "ABC");
    }

    #[test]
    fn test_builder_keeps_stay_positive() {
        let record = CostRecord::new("1", "Hospital", "UTI", "2024-01", 10.0).with_stay(0);
        assert_eq!(record.length_of_stay, 1);
    }
}
