//! Link provisioning and random assignment
//!
//! One experiment run gives every subject a fresh short link to the same
//! campaign URL and an independent Bernoulli(p) treatment draw. The link
//! is the only per-subject differentiator used for click attribution.

use super::LinkShortener;
use crate::models::{Assignment, Shortlink, Subject, Treatment};
use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;
use smsx_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Link Provisioner
///
/// Create calls are issued one at a time, so run time grows linearly with
/// the subject count.
pub struct LinkProvisioner {
    shortener: Arc<dyn LinkShortener>,
}

impl LinkProvisioner {
    pub fn new(shortener: Arc<dyn LinkShortener>) -> Self {
        Self { shortener }
    }

    /// Assign a short link and a treatment arm to every subject
    ///
    /// A failed create call leaves [`Shortlink::Failed`] for that subject and
    /// the batch continues. Draws are independent; there is no blocking, so
    /// small runs may be unbalanced.
    ///
    /// # Errors
    /// `InvalidInput` when `p` is outside [0, 1] or the URL or label is blank.
    pub async fn provision<R: Rng + ?Sized>(
        &self,
        subjects: &[Subject],
        destination_url: &str,
        p: f64,
        experiment_label: &str,
        rng: &mut R,
    ) -> Result<Vec<Assignment>> {
        let draw = Bernoulli::new(p).map_err(|_| {
            Error::InvalidInput(format!("treatment probability {} is not in [0, 1]", p))
        })?;
        if destination_url.trim().is_empty() {
            return Err(Error::InvalidInput("destination URL is empty".to_string()));
        }
        if experiment_label.trim().is_empty() {
            return Err(Error::InvalidInput("experiment label is empty".to_string()));
        }

        let mut assignments = Vec::with_capacity(subjects.len());
        let mut failed_links = 0usize;

        for (index, subject) in subjects.iter().enumerate() {
            let shortlink = match self.shortener.create_link(destination_url).await {
                Ok(link) => Shortlink::Created(link),
                Err(e) => {
                    warn!(row = index + 1, error = %e, "Short link creation failed");
                    failed_links += 1;
                    Shortlink::Failed
                }
            };

            assignments.push(Assignment {
                subject_id: subject.id,
                shortlink,
                treatment: Treatment::from_draw(draw.sample(rng)),
                experiment_label: experiment_label.to_string(),
            });
        }

        let treated = assignments.iter().filter(|a| a.treatment.is_treated()).count();
        info!(
            experiment = experiment_label,
            subjects = assignments.len(),
            treated,
            failed_links,
            "Provisioned experiment run"
        );

        Ok(assignments)
    }
}
