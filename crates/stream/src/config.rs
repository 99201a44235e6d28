use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::policy::ReconnectPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SSE_PATH: &str = "/api/sse/{session_id}";
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

const SESSION_PLACEHOLDER: &str = "{session_id}";
const OAUTH_INITIATE_PATH: &str = "/api/oauth/initiate";

/// Connection settings for a session stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Server origin, without trailing slash
    pub base_url: String,
    /// Stream path; `{session_id}` is replaced by the URL-encoded session id
    pub sse_path: String,
    /// Delay unit for linear reconnection backoff
    pub base_delay_ms: u64,
    /// Reconnection attempts before giving up
    pub max_attempts: u32,
    /// Frames buffered between the transport reader and the controller
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sse_path: DEFAULT_SSE_PATH.to_string(),
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl StreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(StreamError::Config(format!(
                "base_url must be an http(s) URL: {}",
                self.base_url
            )));
        }
        if !self.sse_path.contains(SESSION_PLACEHOLDER) {
            return Err(StreamError::Config(format!(
                "sse_path must contain {}: {}",
                SESSION_PLACEHOLDER, self.sse_path
            )));
        }
        if self.channel_capacity == 0 {
            return Err(StreamError::Config(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Session-scoped stream URL.
    pub fn session_url(&self, session_id: &str) -> String {
        let path = self
            .sse_path
            .replace(SESSION_PLACEHOLDER, &urlencoding::encode(session_id));
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Endpoint that starts the authorization flow for a tool provider.
    pub fn authorization_url(&self, provider: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            OAUTH_INITIATE_PATH,
            urlencoding::encode(provider)
        )
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_millis(self.base_delay_ms), self.max_attempts)
    }
}
