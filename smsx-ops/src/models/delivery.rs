//! Delivery outcomes (stage 3 rows and broadcast rows)

use super::assignment::{Assignment, Shortlink, Treatment};
use super::subject::SubjectId;
use serde::{Deserialize, Serialize};

/// An assignment plus whether the messaging provider accepted its message
///
/// Columns are the stage 2 columns followed by `Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    #[serde(rename = "Phone")]
    pub subject_id: SubjectId,
    #[serde(rename = "Shortlink")]
    pub shortlink: Shortlink,
    #[serde(rename = "Treatment")]
    pub treatment: Treatment,
    #[serde(rename = "Experiment")]
    pub experiment_label: String,
    #[serde(rename = "Success", with = "super::flag")]
    pub success: bool,
}

impl DeliveryResult {
    pub fn from_assignment(assignment: &Assignment, success: bool) -> Self {
        Self {
            subject_id: assignment.subject_id,
            shortlink: assignment.shortlink.clone(),
            treatment: assignment.treatment.clone(),
            experiment_label: assignment.experiment_label.clone(),
            success,
        }
    }
}

/// Outcome of a plain broadcast message (no assignment attached)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    #[serde(rename = "Phone")]
    pub subject_id: SubjectId,
    #[serde(rename = "Success", with = "super::flag")]
    pub success: bool,
}

/// Fraction of successful sends, `None` for an empty batch
pub fn success_rate<I: IntoIterator<Item = bool>>(outcomes: I) -> Option<f64> {
    let (sent, total) = outcomes
        .into_iter()
        .fold((0usize, 0usize), |(s, t), ok| (s + usize::from(ok), t + 1));
    (total > 0).then(|| sent as f64 / total as f64)
}
