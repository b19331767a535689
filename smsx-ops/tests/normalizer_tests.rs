//! Contact Normalizer Tests
//!
//! Phone canonicalization, invalid-row filtering and first-occurrence
//! deduplication on realistic survey exports.

use smsx_common::table::RawTable;
use smsx_ops::services::{normalize_phone, ContactNormalizer, RawLayout};

/// Helper: survey export with the form's column order
fn survey(rows: &[[&str; 8]]) -> RawTable {
    RawTable {
        headers: [
            "Timestamp",
            "What is your phone number?",
            "Graduation",
            "Pronouns",
            "College",
            "Area of study",
            "Number of teas",
            "Consent",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

fn normalizer() -> ContactNormalizer {
    ContactNormalizer::new(RawLayout::survey_export(8))
}

#[test]
fn test_documented_phone_formats() {
    assert_eq!(normalize_phone("14155551234"), Some(4155551234));
    assert_eq!(normalize_phone("(415) 555-1234"), Some(4155551234));
    assert_eq!(normalize_phone("4155551234"), Some(4155551234));
}

#[test]
fn test_doubled_country_code_is_invalid() {
    assert_eq!(normalize_phone("1-1-415-555-1234"), None);
    assert_eq!(normalize_phone("11"), None);
}

#[test]
fn test_row_without_digits_is_dropped_not_an_error() {
    let raw = survey(&[
        ["11/10/2019 9:01", "anise", "2021", "she/her", "Berkeley", "History", "2", "Yes"],
        ["11/10/2019 9:02", "(203) 555-0101", "2022", "he/him", "Morse", "Physics", "0", "Yes"],
    ]);

    let outcome = normalizer().normalize(&raw).unwrap();

    assert_eq!(outcome.dropped_invalid, 1);
    assert_eq!(outcome.table.ids(), vec![2035550101]);
}

#[test]
fn test_duplicates_keep_first_occurrence() {
    let raw = survey(&[
        ["t1", "203-555-0101", "2021", "she/her", "Berkeley", "History", "1", "Yes"],
        ["t2", "203-555-0202", "2022", "he/him", "Morse", "Physics", "0", "Yes"],
        ["t3", "1 (203) 555-0101", "2023", "they/them", "Trumbull", "Math", "5", "Yes"],
        ["t4", "2035550202", "2024", "he/him", "Branford", "Art", "3", "Yes"],
    ]);

    let outcome = normalizer().normalize(&raw).unwrap();

    assert_eq!(outcome.dropped_duplicate, 2);
    assert_eq!(outcome.table.ids(), vec![2035550101, 2035550202]);
    // First submission's answers survive
    assert_eq!(outcome.table.subjects[0].demographics[2], "Berkeley");
    assert_eq!(outcome.table.subjects[1].demographics[2], "Morse");
}

#[test]
fn test_timestamp_and_consent_removed() {
    let raw = survey(&[["t1", "2035550101", "2021", "she/her", "Berkeley", "History", "1", "Yes"]]);

    let outcome = normalizer().normalize(&raw).unwrap();
    let out = outcome.table.to_raw();

    assert_eq!(
        out.headers,
        vec!["Phone", "Graduation", "Pronouns", "College", "Area of study", "Number of teas"]
    );
    assert_eq!(
        out.rows[0],
        vec!["2035550101", "2021", "she/her", "Berkeley", "History", "1"]
    );
}

#[test]
fn test_normalizing_normalized_output_is_noop() {
    let raw = survey(&[
        ["t1", "+1 (203) 555-0101", "2021", "she/her", "Berkeley", "History", "1", "Yes"],
        ["t2", "203.555.0202", "2022", "he/him", "Morse", "Physics", "0", "Yes"],
        ["t3", "203.555.0202", "2022", "he/him", "Morse", "Physics", "0", "Yes"],
        ["t4", "1-1-415-555-1234", "2023", "she/her", "Davenport", "Music", "4", "Yes"],
        ["t5", "203-555-02", "2024", "he/him", "Silliman", "Math", "2", "Yes"],
    ]);
    let first = normalizer().normalize(&raw).unwrap().table;
    assert_eq!(first.ids(), vec![2035550101, 2035550202, 20355502]);

    let again = ContactNormalizer::new(RawLayout::subject_table())
        .normalize(&first.to_raw())
        .unwrap();

    assert_eq!(again.table, first);
    assert_eq!(again.dropped_invalid, 0);
    assert_eq!(again.dropped_duplicate, 0);
}

#[test]
fn test_short_rows_are_padded() {
    let mut raw = survey(&[]);
    raw.rows.push(vec!["t1".to_string(), "2035550101".to_string(), "2021".to_string()]);

    let outcome = normalizer().normalize(&raw).unwrap();

    assert_eq!(outcome.table.subjects[0].demographics.len(), 5);
    assert_eq!(outcome.table.subjects[0].demographics[0], "2021");
}

#[test]
fn test_dedup_completeness_over_many_rows() {
    // Every identifier appears three times in interleaved order
    let mut rows = Vec::new();
    for round in 0..3 {
        for i in 0..20u64 {
            rows.push(vec![
                format!("t{}", round),
                format!("1-203-555-{:04}", i),
                round.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                "Yes".to_string(),
            ]);
        }
    }
    let raw = RawTable {
        headers: survey(&[]).headers,
        rows,
    };

    let outcome = normalizer().normalize(&raw).unwrap();

    assert_eq!(outcome.table.len(), 20);
    assert_eq!(outcome.dropped_duplicate, 40);
    assert!(outcome
        .table
        .subjects
        .iter()
        .all(|s| s.demographics[0] == "0"));
}
