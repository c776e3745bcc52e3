//! HTTP plumbing for the Graph connector: TLS policy, default headers,
//! request pacing, credential injection, and error mapping.
//!
//! There are no automatic retries and no response caching. The captured
//! credential can rotate at any moment, so every request re-reads it, and a
//! failed call is simply re-run by the operator.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use fl_core::{LensError, LensResult};

use crate::config::{GraphConfig, RateLimitConfig};
use crate::credentials::CredentialProvider;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: CredentialProvider,
    rate_limiter: Option<Arc<DirectRateLimiter>>,
}

impl HttpClient {
    pub fn new(config: &GraphConfig, credentials: CredentialProvider) -> LensResult<Self> {
        // TLS verification can only be disabled in debug builds.
        let verify_tls = if !config.verify_tls {
            #[cfg(debug_assertions)]
            {
                warn!(
                    base_url = %config.base_url,
                    "TLS certificate verification disabled in development mode"
                );
                false
            }
            #[cfg(not(debug_assertions))]
            {
                warn!(
                    base_url = %config.base_url,
                    "refusing to disable TLS verification in a release build"
                );
                true
            }
        } else {
            true
        };

        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            if let (Ok(name), Ok(val)) = (
                reqwest::header::HeaderName::try_from(key.as_str()),
                reqwest::header::HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, val);
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!verify_tls)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .default_headers(headers)
            .build()
            .map_err(|e| LensError::Config(e.to_string()))?;

        let rate_limiter = match &config.rate_limit {
            Some(limit) => Some(Arc::new(build_limiter(limit)?)),
            None => None,
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter,
        })
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> LensResult<T> {
        let mut request = self.client.get(self.build_url(path));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let body = self.send(request).await?;
        parse_json(&body)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> LensResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.build_url(path)).json(body);
        let text = self.send(request).await?;
        parse_json(&text)
    }

    /// POST where only the status matters (member references, log-collection
    /// requests).
    pub async fn post_no_content<B>(&self, path: &str, body: &B) -> LensResult<()>
    where
        B: Serialize + ?Sized,
    {
        let request = self.client.post(self.build_url(path)).json(body);
        self.send(request).await.map(drop)
    }

    pub async fn delete(&self, path: &str) -> LensResult<()> {
        let request = self.client.delete(self.build_url(path));
        self.send(request).await.map(drop)
    }

    /// Paces, authenticates, sends, and reduces the response to its body
    /// text or an error.
    async fn send(&self, request: RequestBuilder) -> LensResult<String> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let token = self.credentials.bearer_token()?;
        let request = request.header(
            "Authorization",
            format!("Bearer {}", token.expose_secret()),
        );

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LensError::Network(format!("timeout: {e}"))
            } else if e.is_connect() {
                LensError::Network(format!("connection failed: {e}"))
            } else {
                LensError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LensError::Network(e.to_string()))?;
        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("throttled by the service");
            }
            return Err(LensError::http(status.as_u16(), body));
        }
        debug!(status = status.as_u16(), bytes = body.len(), "request completed");
        Ok(body)
    }
}

fn build_limiter(limit: &RateLimitConfig) -> LensResult<DirectRateLimiter> {
    let period = Duration::from_secs(limit.period_secs);
    let max = limit.max_requests.max(1);
    let quota = Quota::with_period(period / max)
        .ok_or_else(|| LensError::Config("rate limit period must be non-zero".to_string()))?
        .allow_burst(NonZeroU32::new(limit.burst_size).unwrap_or(NonZeroU32::MIN));
    Ok(RateLimiter::direct(quota))
}

/// Parses a JSON body, carrying a short snippet into the error.
fn parse_json<T: DeserializeOwned>(body: &str) -> LensResult<T> {
    // Some mutating endpoints answer 204 with an empty body.
    let candidate = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(candidate).map_err(|e| {
        LensError::Decode(format!(
            "{e} - body: {}",
            body.chars().take(500).collect::<String>()
        ))
    })
}
