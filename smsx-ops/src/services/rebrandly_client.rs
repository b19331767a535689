//! Rebrandly API client
//!
//! Creates branded short links and lists existing links with their click
//! counts. Authenticates with a static API key header.
//!
//! API Documentation: https://developers.rebrandly.com/reference

use super::{LinkPageQuery, LinkShortener};
use crate::models::LinkStat;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("smsx-ops/", env!("CARGO_PKG_VERSION"));

/// Rebrandly client errors
#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Everything the client needs, resolved by the caller
#[derive(Debug, Clone)]
pub struct RebrandlySettings {
    pub api_key: String,
    /// Branded domain; `None` uses the account default (rebrand.ly)
    pub domain: Option<String>,
    pub base_url: String,
    pub requests_per_second: u32,
}

#[derive(Debug, Deserialize)]
struct CreatedLink {
    #[serde(rename = "shortUrl")]
    short_url: String,
}

/// Rebrandly API client
pub struct RebrandlyClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    domain: Option<String>,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl RebrandlyClient {
    pub fn new(settings: RebrandlySettings) -> Result<Self, ShortenerError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ShortenerError::NetworkError(e.to_string()))?;

        let per_second = NonZeroU32::new(settings.requests_per_second).ok_or_else(|| {
            ShortenerError::InvalidConfig("requests_per_second must be at least 1".to_string())
        })?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            domain: settings.domain,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn links_url(&self) -> String {
        format!("{}/links", self.base_url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ShortenerError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ShortenerError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ShortenerError::ApiError(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl LinkShortener for RebrandlyClient {
    async fn create_link(&self, destination_url: &str) -> Result<String, ShortenerError> {
        self.rate_limiter.until_ready().await;

        let mut body = json!({ "destination": destination_url });
        if let Some(domain) = &self.domain {
            body["domain"] = json!({ "fullName": domain });
        }

        tracing::debug!(destination = %destination_url, "Creating Rebrandly link");

        let response = self
            .http_client
            .post(self.links_url())
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ShortenerError::NetworkError(e.to_string()))?;

        let link: CreatedLink = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ShortenerError::ParseError(e.to_string()))?;

        Ok(link.short_url)
    }

    async fn list_links(&self, query: &LinkPageQuery) -> Result<Vec<LinkStat>, ShortenerError> {
        self.rate_limiter.until_ready().await;

        let limit = query.limit.to_string();
        let mut params = vec![
            ("orderBy", "createdAt"),
            ("orderDir", "desc"),
            ("limit", limit.as_str()),
        ];
        if let Some(last) = &query.last {
            params.push(("last", last.as_str()));
        }

        tracing::debug!(limit = query.limit, last = ?query.last, "Listing Rebrandly links");

        let response = self
            .http_client
            .get(self.links_url())
            .header("apikey", &self.api_key)
            .query(&params)
            .send()
            .await
            .map_err(|e| ShortenerError::NetworkError(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ShortenerError::ParseError(e.to_string()))
    }
}
