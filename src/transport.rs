//! HTTP transport for the provider APIs.
//!
//! The [`Transport`] trait is the seam between the search engine and the
//! network: production runs use [`HttpTransport`], tests substitute stubs that
//! return canned JSON.

use crate::error::{HttpFailure, LitReviewError, Result, TransportError};
use crate::provider::mask_secret;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Fixed per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of a failed response body kept for diagnostics
const BODY_EXCERPT_CHARS: usize = 500;

/// One GET request against a provider.
pub struct ApiRequest {
    pub url: Url,
    /// Extra headers, credential headers included
    pub headers: Vec<(&'static str, String)>,
    /// Log the masked URL, status and timing
    pub verbose: bool,
    /// Query parameter whose value must never be logged in clear
    pub masked_param: Option<&'static str>,
}

impl ApiRequest {
    pub fn masked_url(&self) -> String {
        mask_credential(&self.url, self.masked_param)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and decode the JSON body of a 2xx response.
    async fn get(&self, request: &ApiRequest) -> std::result::Result<Value, TransportError>;
}

/// reqwest-backed transport with a 30 second timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LitReviewError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &ApiRequest) -> std::result::Result<Value, TransportError> {
        let started = Instant::now();
        debug!(url = %request.masked_url(), "GET");

        let mut builder = self
            .client
            .get(request.url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(url = %request.masked_url(), error = %e, "Request failed");
            TransportError::Request(e)
        })?;
        let status = response.status();

        if request.verbose {
            info!(
                url = %request.masked_url(),
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Response received"
            );
        }

        if !status.is_success() {
            let headers = response
                .headers()
                .iter()
                .filter(|(name, _)| is_diagnostic_header(name.as_str()))
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or("<non-ascii>").to_string(),
                    )
                })
                .collect();
            let body = response.text().await.unwrap_or_default();

            return Err(HttpFailure {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                headers,
                body_excerpt: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            }
            .into());
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Rate-limit, auth and vendor error headers worth keeping.
fn is_diagnostic_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("x-") || name.starts_with("www-") || name.starts_with("retry")
}

/// Render `url` with the value of `param` masked.
pub fn mask_credential(url: &Url, param: Option<&str>) -> String {
    let Some(param) = param else {
        return url.to_string();
    };
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if !pairs.iter().any(|(k, _)| k == param) {
        return url.to_string();
    }

    let mut masked = url.clone();
    {
        let mut query = masked.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            if key == param {
                query.append_pair(key, &mask_secret(value));
            } else {
                query.append_pair(key, value);
            }
        }
    }
    masked.to_string()
}
