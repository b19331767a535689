//! Experimental assignments (stage 2 rows)

use super::subject::SubjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Written in place of a short link whose creation failed
pub const SHORTLINK_FAILURE: &str = "Error";

/// Per-subject tracking link, or the marker left by a failed create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortlink {
    Created(String),
    Failed,
}

impl Shortlink {
    pub fn as_created(&self) -> Option<&str> {
        match self {
            Shortlink::Created(link) => Some(link),
            Shortlink::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Shortlink::Failed)
    }
}

impl fmt::Display for Shortlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortlink::Created(link) => f.write_str(link),
            Shortlink::Failed => f.write_str(SHORTLINK_FAILURE),
        }
    }
}

impl Serialize for Shortlink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Shortlink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == SHORTLINK_FAILURE {
            Ok(Shortlink::Failed)
        } else {
            Ok(Shortlink::Created(trimmed.to_string()))
        }
    }
}

/// Experimental arm
///
/// Tables edited by hand can carry a value that is neither arm; it is kept
/// as `Unrecognized` so it round-trips and the row can be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Treatment {
    Control,
    Treated,
    Unrecognized(String),
}

impl Treatment {
    pub fn from_draw(treated: bool) -> Self {
        if treated {
            Treatment::Treated
        } else {
            Treatment::Control
        }
    }

    pub fn is_treated(&self) -> bool {
        matches!(self, Treatment::Treated)
    }
}

impl Serialize for Treatment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Treatment::Control => serializer.serialize_u8(0),
            Treatment::Treated => serializer.serialize_u8(1),
            Treatment::Unrecognized(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for Treatment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match super::flag::parse(&raw) {
            Some(treated) => Treatment::from_draw(treated),
            None => Treatment::Unrecognized(raw),
        })
    }
}

/// Ties one subject to one experiment run
///
/// Created once per run and never edited; a new run writes a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "Phone")]
    pub subject_id: SubjectId,
    #[serde(rename = "Shortlink")]
    pub shortlink: Shortlink,
    #[serde(rename = "Treatment")]
    pub treatment: Treatment,
    #[serde(rename = "Experiment")]
    pub experiment_label: String,
}
