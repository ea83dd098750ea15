//! GTFS-realtime HTTP client.
//!
//! Fetches protobuf snapshots from the feed provider, authenticating with
//! an API key header, and converts them to trip sets filtered down to the
//! stops we care about.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::domain::{StopId, TripSet};

use super::TripSource;
use super::convert::{convert_feed, decode_feed};
use super::error::FeedError;

/// Default feed: NYCT B, D, F, M lines.
pub const DEFAULT_FEED_URL: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-bdfm";

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// API key for x-api-key header authentication
    pub api_key: String,
    /// Feed endpoint URL
    pub url: String,
    /// Stops that trips must be headed for to be kept
    pub target_stops: Vec<StopId>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedConfig {
    /// Create a new config with the given API key and target stops.
    pub fn new(api_key: impl Into<String>, target_stops: Vec<StopId>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_FEED_URL.to_string(),
            target_stops,
            timeout_secs: 30,
        }
    }

    /// Set a custom feed URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for a GTFS-realtime feed endpoint.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    target_stops: Vec<StopId>,
}

impl FeedClient {
    /// Create a new feed client.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| FeedError::Api {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;
        headers.insert(HeaderName::from_static("x-api-key"), api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
            target_stops: config.target_stops,
        })
    }

    /// Fetch one snapshot from the provider.
    async fn fetch(&self) -> Result<TripSet, FeedError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.bytes().await?;
        let feed = decode_feed(&body)?;
        let trips = convert_feed(&feed, &self.target_stops);

        debug!(
            entities = feed.entity.len(),
            trips = trips.len(),
            bytes = body.len(),
            "fetched feed snapshot"
        );

        Ok(trips)
    }
}

/// Error for a non-success response status.
fn status_error(status: StatusCode, body: &str) -> FeedError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FeedError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => FeedError::RateLimited,
        _ => FeedError::Api {
            status: status.as_u16(),
            message: body.chars().take(500).collect(),
        },
    }
}

impl TripSource for FeedClient {
    async fn fetch_initial(&self) -> Result<TripSet, FeedError> {
        self.fetch().await
    }

    async fn refresh(&self, existing: &TripSet) -> Result<TripSet, FeedError> {
        let fresh = self.fetch().await?;

        if fresh.feed_timestamp.is_some() && fresh.feed_timestamp == existing.feed_timestamp {
            debug!(
                timestamp = ?fresh.feed_timestamp,
                "feed has not advanced since last refresh"
            );
        }

        Ok(fresh)
    }
}
