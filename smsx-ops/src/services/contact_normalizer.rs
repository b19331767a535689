//! Contact normalization for survey intake
//!
//! Turns a raw survey export into the stage 1 subject table:
//! 1. Reduce the phone field to digits and strip one leading country-code `1`
//! 2. Drop rows with no usable identifier
//! 3. Keep the first row per identifier, drop later duplicates
//! 4. Remove the timestamp and consent columns

use crate::models::{Subject, SubjectId, SubjectTable};
use smsx_common::table::RawTable;
use smsx_common::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Expected length of a national number
const NATIONAL_NUMBER_DIGITS: usize = 10;

/// Column positions in the raw export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLayout {
    pub phone_column: usize,
    pub timestamp_column: Option<usize>,
    pub consent_column: Option<usize>,
}

impl RawLayout {
    /// Survey form export: timestamp, phone, demographics..., consent
    pub fn survey_export(column_count: usize) -> Self {
        Self {
            phone_column: 1,
            timestamp_column: Some(0),
            consent_column: column_count.checked_sub(1),
        }
    }

    /// Already-normalized stage 1 table: phone first, nothing to remove
    pub fn subject_table() -> Self {
        Self {
            phone_column: 0,
            timestamp_column: None,
            consent_column: None,
        }
    }

    fn is_removed(&self, column: usize) -> bool {
        column == self.phone_column
            || self.timestamp_column == Some(column)
            || self.consent_column == Some(column)
    }

    fn validate(&self, column_count: usize) -> Result<()> {
        let columns = [
            Some(self.phone_column),
            self.timestamp_column,
            self.consent_column,
        ];
        if let Some(out_of_range) = columns.into_iter().flatten().find(|c| *c >= column_count) {
            return Err(Error::InvalidInput(format!(
                "column {} does not exist (table has {} columns)",
                out_of_range, column_count
            )));
        }
        Ok(())
    }
}

/// Canonical subject identifier for a free-text phone field
///
/// Non-digits are removed and a single leading `1` (country code) is
/// stripped. Returns `None` when nothing usable remains: respondents who
/// typed something other than a number cannot be messaged, so their rows
/// are filtered out of the experiment rather than treated as errors.
///
/// An identifier is never zero and never starts with `1` (no national
/// number does), so every returned id normalizes to itself.
pub fn normalize_phone(raw: &str) -> Option<SubjectId> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = digits.strip_prefix('1').unwrap_or(&digits);
    let id: SubjectId = national.parse().ok()?;
    if id == 0 || id.to_string().starts_with('1') {
        return None;
    }
    Some(id)
}

/// Result of a normalization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub table: SubjectTable,
    pub dropped_invalid: usize,
    pub dropped_duplicate: usize,
}

/// Contact Normalizer
pub struct ContactNormalizer {
    layout: RawLayout,
}

impl ContactNormalizer {
    pub fn new(layout: RawLayout) -> Self {
        Self { layout }
    }

    /// Normalize a raw table into one row per unique subject
    ///
    /// The surviving row for an identifier is always its first occurrence.
    pub fn normalize(&self, raw: &RawTable) -> Result<NormalizeOutcome> {
        self.layout.validate(raw.headers.len())?;

        let demographic_headers = self.keep_columns(&raw.headers);

        let mut seen = HashSet::new();
        let mut subjects = Vec::new();
        let mut dropped_invalid = 0;
        let mut dropped_duplicate = 0;

        for (line, row) in raw.rows.iter().enumerate() {
            let phone = row
                .get(self.layout.phone_column)
                .map(String::as_str)
                .unwrap_or("");

            let Some(id) = normalize_phone(phone) else {
                debug!(row = line + 1, "Dropping row without a usable phone number");
                dropped_invalid += 1;
                continue;
            };

            if !seen.insert(id) {
                debug!(row = line + 1, "Dropping duplicate submission");
                dropped_duplicate += 1;
                continue;
            }

            if digit_count(id) != NATIONAL_NUMBER_DIGITS {
                warn!(
                    row = line + 1,
                    digits = digit_count(id),
                    "Identifier is not a 10-digit national number"
                );
            }

            let mut demographics = self.keep_columns(row);
            demographics.resize(demographic_headers.len(), String::new());
            subjects.push(Subject { id, demographics });
        }

        info!(
            rows = raw.rows.len(),
            subjects = subjects.len(),
            dropped_invalid,
            dropped_duplicate,
            "Normalized survey responses"
        );

        Ok(NormalizeOutcome {
            table: SubjectTable {
                demographic_headers,
                subjects,
            },
            dropped_invalid,
            dropped_duplicate,
        })
    }

    fn keep_columns(&self, cells: &[String]) -> Vec<String> {
        cells
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.layout.is_removed(*i))
            .map(|(_, c)| c.clone())
            .collect()
    }
}

fn digit_count(id: SubjectId) -> usize {
    id.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_country_code() {
        assert_eq!(normalize_phone("14155551234"), Some(4155551234));
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(normalize_phone("(415) 555-1234"), Some(4155551234));
        assert_eq!(normalize_phone("+1 415.555.1234"), Some(4155551234));
    }

    #[test]
    fn test_second_leading_one_is_invalid() {
        assert_eq!(normalize_phone("114155551234"), None);
        assert_eq!(normalize_phone("1-1-415-555-1234"), None);
    }

    #[test]
    fn test_leading_zeros_cannot_expose_a_one() {
        assert_eq!(normalize_phone("0123"), None);
        assert_eq!(normalize_phone("000"), None);
        assert_eq!(normalize_phone("0415"), Some(415));
    }

    #[test]
    fn test_output_normalizes_to_itself() {
        for raw in ["+1 (203) 555-0101", "415", "0415", "99999999999", "1 2"] {
            if let Some(id) = normalize_phone(raw) {
                assert_eq!(normalize_phone(&id.to_string()), Some(id), "{}", raw);
            }
        }
    }

    #[test]
    fn test_no_digits_is_none() {
        assert_eq!(normalize_phone("anise"), None);
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("1"), None);
    }

    #[test]
    fn test_overflow_is_none() {
        assert_eq!(normalize_phone("999999999999999999999999"), None);
    }

    #[test]
    fn test_survey_layout() {
        let layout = RawLayout::survey_export(8);
        assert_eq!(layout.consent_column, Some(7));
        assert!(layout.is_removed(0));
        assert!(layout.is_removed(1));
        assert!(!layout.is_removed(2));
    }

    #[test]
    fn test_layout_out_of_range() {
        let normalizer = ContactNormalizer::new(RawLayout {
            phone_column: 5,
            timestamp_column: None,
            consent_column: None,
        });
        let raw = RawTable {
            headers: vec!["Phone".to_string()],
            rows: vec![],
        };
        assert!(matches!(
            normalizer.normalize(&raw),
            Err(Error::InvalidInput(_))
        ));
    }
}
