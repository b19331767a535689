//! Survey subjects

use smsx_common::table::RawTable;
use smsx_common::{Error, Result};

/// Subject identifier: the national phone number as an integer
pub type SubjectId = u64;

/// Header of the identifier column in every stage table
pub const PHONE_HEADER: &str = "Phone";

/// One survey respondent after intake
///
/// Demographic fields are opaque to the pipeline and carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub demographics: Vec<String>,
}

/// Stage 1 table: one row per unique subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectTable {
    pub demographic_headers: Vec<String>,
    pub subjects: Vec<Subject>,
}

impl SubjectTable {
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn ids(&self) -> Vec<SubjectId> {
        self.subjects.iter().map(|s| s.id).collect()
    }

    /// Encode as `Phone,<demographic headers...>`
    pub fn to_raw(&self) -> RawTable {
        let mut headers = Vec::with_capacity(self.demographic_headers.len() + 1);
        headers.push(PHONE_HEADER.to_string());
        headers.extend(self.demographic_headers.iter().cloned());

        let rows = self
            .subjects
            .iter()
            .map(|s| {
                let mut row = Vec::with_capacity(s.demographics.len() + 1);
                row.push(s.id.to_string());
                row.extend(s.demographics.iter().cloned());
                row
            })
            .collect();

        RawTable { headers, rows }
    }

    /// Decode a stage 1 table
    ///
    /// The table was written by the normalizer, so an unparseable
    /// identifier here is corruption and is reported rather than dropped.
    pub fn from_raw(table: &RawTable) -> Result<Self> {
        let phone_column = table
            .headers
            .iter()
            .position(|h| h == PHONE_HEADER)
            .ok_or_else(|| {
                Error::InvalidInput(format!("subject table has no '{}' column", PHONE_HEADER))
            })?;

        let demographic_headers = table
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != phone_column)
            .map(|(_, h)| h.clone())
            .collect();

        let mut subjects = Vec::with_capacity(table.rows.len());
        for (line, row) in table.rows.iter().enumerate() {
            let cell = row.get(phone_column).map(String::as_str).unwrap_or("");
            let id = cell.trim().parse::<SubjectId>().map_err(|_| {
                Error::InvalidInput(format!(
                    "subject table row {}: invalid identifier '{}'",
                    line + 1,
                    cell
                ))
            })?;
            let demographics = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != phone_column)
                .map(|(_, v)| v.clone())
                .collect();
            subjects.push(Subject { id, demographics });
        }

        Ok(Self {
            demographic_headers,
            subjects,
        })
    }
}
