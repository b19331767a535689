//! Twilio Messages API client
//!
//! Submits SMS (body only) and MMS (body + media URL) messages.
//! Authenticates with account SID + auth token over HTTP basic auth.
//!
//! API Documentation: https://www.twilio.com/docs/messaging/api/message-resource

use super::{MessageSender, OutboundMessage};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("smsx-ops/", env!("CARGO_PKG_VERSION"));

/// Twilio client errors
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed")]
    Unauthorized,

    /// Provider refused the message (invalid number, unverified sender, ...)
    #[error("Message rejected ({0}): {1}")]
    Rejected(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Everything the client needs, resolved by the caller
#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub base_url: String,
}

/// Subset of the Message resource returned on creation
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned on 4xx
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u32>,
    message: String,
}

/// Twilio API client
pub struct TwilioClient {
    http_client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(settings: TwilioSettings) -> Result<Self, MessagingError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| MessagingError::NetworkError(e.to_string()))?;

        let messages_url = format!(
            "{}/Accounts/{}/Messages.json",
            settings.base_url.trim_end_matches('/'),
            settings.account_sid
        );

        Ok(Self {
            http_client,
            messages_url,
            account_sid: settings.account_sid,
            auth_token: settings.auth_token,
        })
    }
}

#[async_trait]
impl MessageSender for TwilioClient {
    async fn send(&self, message: &OutboundMessage) -> Result<String, MessagingError> {
        let mut params = vec![
            ("Body", message.body.as_str()),
            ("From", message.from.as_str()),
            ("To", message.to.as_str()),
        ];
        if let Some(media) = &message.media_url {
            params.push(("MediaUrl", media.as_str()));
        }

        let response = self
            .http_client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| MessagingError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(MessagingError::Unauthorized);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(ErrorBody {
                    code: Some(code),
                    message,
                }) => format!("{} (code {})", message, code),
                Ok(ErrorBody { message, .. }) => message,
                Err(_) => text,
            };
            return Err(MessagingError::Rejected(status.as_u16(), detail));
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| MessagingError::ParseError(e.to_string()))?;

        tracing::debug!(
            sid = %resource.sid,
            status = resource.status.as_deref().unwrap_or("unknown"),
            mms = message.media_url.is_some(),
            "Message accepted"
        );

        Ok(resource.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let client = TwilioClient::new(TwilioSettings {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            base_url: "https://api.twilio.com/2010-04-01/".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.messages_url,
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_error_body_decodes() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code": 21211, "message": "The 'To' number is not a valid phone number.", "status": 400}"#,
        )
        .unwrap();
        assert_eq!(body.code, Some(21211));
    }
}
