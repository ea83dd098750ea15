//! Feed error types.

/// Errors that can occur while fetching or decoding a feed snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed provider rejected the API key
    #[error("unauthorized: check LEAVE_NOW_API_KEY")]
    Unauthorized,

    /// Rate limited by the feed provider
    #[error("rate limited by feed provider")]
    RateLimited,

    /// Feed provider returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body was not a valid GTFS-realtime message
    #[error("feed decode error: {message}")]
    Decode { message: String },

    /// Fixture snapshot could not be loaded
    #[error("fixture error: {message}")]
    Fixture { message: String },
}

impl FeedError {
    /// Whether retrying later can be expected to help.
    ///
    /// A rejected API key will not fix itself; everything else (network
    /// blips, provider hiccups, a half-written snapshot) might.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, FeedError::Unauthorized)
    }
}
