//! Pipeline components and the external services they call
//!
//! Components depend on the [`LinkShortener`] and [`MessageSender`] traits
//! only; the HTTP clients are one implementation, test fakes are another.

pub mod click_aggregator;
pub mod contact_normalizer;
pub mod link_provisioner;
pub mod message_dispatcher;
pub mod rebrandly_client;
pub mod twilio_client;

pub use click_aggregator::{AggregateError, AggregateReport, ClickAggregator, Pager, PagerState, StopReason};
pub use contact_normalizer::{normalize_phone, ContactNormalizer, NormalizeOutcome, RawLayout};
pub use link_provisioner::LinkProvisioner;
pub use message_dispatcher::{compose_body, recipient_address, MessageDispatcher, SendConfirmation};
pub use rebrandly_client::{RebrandlyClient, RebrandlySettings, ShortenerError};
pub use twilio_client::{MessagingError, TwilioClient, TwilioSettings};

use crate::models::LinkStat;
use async_trait::async_trait;

/// One request against the link-listing endpoint
///
/// Results are always ordered by creation time, newest first. `last` is the
/// exclusive-start cursor; `None` starts from the most recent link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPageQuery {
    pub limit: u32,
    pub last: Option<String>,
}

/// Link-shortening service
#[async_trait]
pub trait LinkShortener: Send + Sync {
    /// Create one short link pointing at `destination_url`, returning its short URL
    async fn create_link(&self, destination_url: &str) -> Result<String, ShortenerError>;

    /// Fetch one page of links
    async fn list_links(&self, query: &LinkPageQuery) -> Result<Vec<LinkStat>, ShortenerError>;
}

/// A message ready for the messaging provider
///
/// `media_url` present means a multimedia message, absent means plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    pub from: String,
    pub to: String,
    pub media_url: Option<String>,
}

/// Messaging service
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Submit one message, returning the provider's message id on acceptance
    async fn send(&self, message: &OutboundMessage) -> Result<String, MessagingError>;
}
