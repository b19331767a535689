//! Message dispatch
//!
//! Sends one message per assignment: plain text for control, text + media
//! for treatment, each embedding the subject's short link. Failures are
//! isolated per row and recorded; the batch always runs to the end.
//!
//! Sending reaches real people and is not idempotent. Every send operation
//! takes a [`SendConfirmation`] stating how many rows the operator expects
//! to send; a mismatch aborts before the first message.

use super::{MessageSender, OutboundMessage};
use crate::models::delivery::success_rate;
use crate::models::{Assignment, BroadcastResult, DeliveryResult, SubjectId, Treatment};
use smsx_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Operator acknowledgement that a batch of `expected` messages will go out
///
/// Consumed by the send call, so one acknowledgement covers one batch.
#[derive(Debug)]
pub struct SendConfirmation {
    expected: usize,
}

impl SendConfirmation {
    pub fn for_batch(expected: usize) -> Self {
        Self { expected }
    }

    /// `InvalidInput` unless the batch has exactly the confirmed size
    pub fn check(&self, actual: usize) -> Result<()> {
        if self.expected != actual {
            return Err(Error::InvalidInput(format!(
                "confirmation was for {} messages but the batch has {}; nothing sent",
                self.expected, actual
            )));
        }
        Ok(())
    }
}

/// `message_body` followed by the link as a URL and a closing period
pub fn compose_body(message_body: &str, shortlink: &str) -> String {
    if shortlink.starts_with("http://") || shortlink.starts_with("https://") {
        format!("{}{}.", message_body, shortlink)
    } else {
        format!("{}http://{}.", message_body, shortlink)
    }
}

/// E.164 recipient address for a national subject id
pub fn recipient_address(country_code: &str, id: SubjectId) -> String {
    format!("+{}{}", country_code.trim_start_matches('+'), id)
}

/// Message Dispatcher
pub struct MessageDispatcher {
    sender: Arc<dyn MessageSender>,
    source_identity: String,
    country_code: String,
}

impl MessageDispatcher {
    pub fn new(sender: Arc<dyn MessageSender>, source_identity: String, country_code: String) -> Self {
        Self {
            sender,
            source_identity,
            country_code,
        }
    }

    /// Send one experiment message per assignment
    ///
    /// Returns exactly one result per assignment, in input order. Rows whose
    /// treatment is unrecognized or whose link creation failed are recorded
    /// as failed without contacting the provider.
    pub async fn dispatch(
        &self,
        assignments: &[Assignment],
        message_body: &str,
        media_url: &str,
        confirmation: SendConfirmation,
    ) -> Result<Vec<DeliveryResult>> {
        self.dispatch_recording(assignments, message_body, media_url, confirmation, |_| Ok(()))
            .await
    }

    /// [`dispatch`](Self::dispatch), handing each result to `record` as soon
    /// as its row is done
    ///
    /// A `record` error stops the batch before the next send: a row that
    /// cannot be recorded must not be followed by more unrecorded sends.
    pub async fn dispatch_recording<F>(
        &self,
        assignments: &[Assignment],
        message_body: &str,
        media_url: &str,
        confirmation: SendConfirmation,
        mut record: F,
    ) -> Result<Vec<DeliveryResult>>
    where
        F: FnMut(&DeliveryResult) -> Result<()>,
    {
        confirmation.check(assignments.len())?;

        let mut results = Vec::with_capacity(assignments.len());

        for (index, assignment) in assignments.iter().enumerate() {
            let success = self
                .deliver(index + 1, assignment, message_body, media_url)
                .await;
            let result = DeliveryResult::from_assignment(assignment, success);
            record(&result)?;
            results.push(result);
        }

        info!(
            messages = results.len(),
            delivered = results.iter().filter(|r| r.success).count(),
            success_rate = success_rate(results.iter().map(|r| r.success)).unwrap_or(0.0),
            "Dispatch complete"
        );

        Ok(results)
    }

    /// Send the same plain text message to every subject
    pub async fn broadcast(
        &self,
        subjects: &[SubjectId],
        message_body: &str,
        confirmation: SendConfirmation,
    ) -> Result<Vec<BroadcastResult>> {
        self.broadcast_recording(subjects, message_body, confirmation, |_| Ok(()))
            .await
    }

    /// [`broadcast`](Self::broadcast) with per-row recording
    pub async fn broadcast_recording<F>(
        &self,
        subjects: &[SubjectId],
        message_body: &str,
        confirmation: SendConfirmation,
        mut record: F,
    ) -> Result<Vec<BroadcastResult>>
    where
        F: FnMut(&BroadcastResult) -> Result<()>,
    {
        confirmation.check(subjects.len())?;

        let mut results = Vec::with_capacity(subjects.len());

        for (index, &subject_id) in subjects.iter().enumerate() {
            let message = OutboundMessage {
                body: message_body.to_string(),
                from: self.source_identity.clone(),
                to: recipient_address(&self.country_code, subject_id),
                media_url: None,
            };
            let result = BroadcastResult {
                subject_id,
                success: self.send_isolated(index + 1, &message).await,
            };
            record(&result)?;
            results.push(result);
        }

        info!(
            messages = results.len(),
            success_rate = success_rate(results.iter().map(|r| r.success)).unwrap_or(0.0),
            "Broadcast complete"
        );

        Ok(results)
    }

    /// Whether the provider accepted this row's message; `row` is 1-based
    async fn deliver(
        &self,
        row: usize,
        assignment: &Assignment,
        message_body: &str,
        media_url: &str,
    ) -> bool {
        let media = match &assignment.treatment {
            Treatment::Control => None,
            Treatment::Treated => Some(media_url.to_string()),
            Treatment::Unrecognized(raw) => {
                warn!(row, treatment = %raw, "Unrecognized treatment, not sending");
                return false;
            }
        };

        let Some(link) = assignment.shortlink.as_created() else {
            warn!(row, "No short link, not sending");
            return false;
        };

        let message = OutboundMessage {
            body: compose_body(message_body, link),
            from: self.source_identity.clone(),
            to: recipient_address(&self.country_code, assignment.subject_id),
            media_url: media,
        };

        self.send_isolated(row, &message).await
    }

    /// Provider errors stop here; the caller only sees success or failure
    async fn send_isolated(&self, row: usize, message: &OutboundMessage) -> bool {
        match self.sender.send(message).await {
            Ok(_) => true,
            Err(e) => {
                warn!(row, error = %e, "Message not accepted");
                false
            }
        }
    }
}
