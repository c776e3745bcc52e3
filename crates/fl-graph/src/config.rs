//! Connector configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Settings for the Graph HTTP client.
///
/// Every field has a default, so an empty config section works out of the
/// box against the public Graph endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub verify_tls: bool,
    /// Client-side request pacing; `None` sends unthrottled.
    pub rate_limit: Option<RateLimitConfig>,
    /// Extra headers attached to every request.
    pub headers: HashMap<String, String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com".to_string(),
            timeout_secs: 30,
            verify_tls: true,
            rate_limit: None,
            headers: HashMap::new(),
        }
    }
}

/// Request pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per period.
    pub max_requests: u32,
    /// Period duration in seconds.
    pub period_secs: u64,
    /// Maximum burst size.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            period_secs: 60,
            burst_size: 10,
        }
    }
}
