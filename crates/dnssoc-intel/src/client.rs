//! MISP-compatible REST client.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dnssoc_core::{IntelContext, Result, SocError};
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::provider::{AttributeType, IntelProvider, RemoteAttribute};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request budget per second against one server
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Client for one MISP-compatible intelligence server
#[derive(Clone, Debug)]
pub struct MispClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    http: HttpClient,
    name: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl MispClient {
    /// Create a builder for the given server URL and API key
    #[must_use]
    pub fn builder(base_url: impl Into<String>, api_key: impl Into<String>) -> MispClientBuilder {
        MispClientBuilder::new(base_url, api_key)
    }

    /// POST against `/attributes/restSearch` and unwrap the attribute list
    async fn rest_search<B: Serialize>(&self, body: &B) -> Result<Vec<MispAttribute>> {
        // Wait for rate limiter
        self.inner.rate_limiter.until_ready().await;

        let url = format!("{}/attributes/restSearch", self.inner.base_url);
        debug!(server = %self.inner.name, url = %url, "restSearch request");

        let response = self
            .inner
            .http
            .post(&url)
            .header("Authorization", &self.inner.api_key)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let message = response.text().await.unwrap_or_default();

            return match code {
                401 | 403 => Err(SocError::Unauthorized {
                    server: self.inner.name.clone(),
                }),
                _ => Err(SocError::Query {
                    server: self.inner.name.clone(),
                    reason: format!("HTTP {code}: {}", snippet(&message)),
                }),
            };
        }

        let body: RestSearchResponse = response.json().await.map_err(|e| SocError::Query {
            server: self.inner.name.clone(),
            reason: format!("malformed response: {e}"),
        })?;

        Ok(body.response.attribute)
    }

    fn request_error(&self, err: &reqwest::Error) -> SocError {
        if err.is_timeout() {
            SocError::Timeout {
                server: self.inner.name.clone(),
                seconds: self.inner.timeout.as_secs(),
            }
        } else {
            SocError::Query {
                server: self.inner.name.clone(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl IntelProvider for MispClient {
    fn name(&self) -> &str {
        &self.inner.name
    }

    #[instrument(skip(self, filter), fields(server = %self.inner.name))]
    async fn search(
        &self,
        filter: &[AttributeType],
        active_only: bool,
    ) -> Result<Vec<RemoteAttribute>> {
        let request = SearchRequest {
            return_format: "json",
            attribute_type: filter.iter().map(AttributeType::as_str).collect(),
            to_ids: active_only.then_some(true),
            value: None,
            include_context: None,
        };

        let attributes = self.rest_search(&request).await?;

        let mut results = Vec::with_capacity(attributes.len());
        for attr in attributes {
            match AttributeType::from_wire(&attr.attribute_type) {
                Some(kind) => results.push(RemoteAttribute {
                    value: attr.value,
                    kind,
                }),
                None => debug!(
                    server = %self.inner.name,
                    kind = %attr.attribute_type,
                    "skipping attribute of unhandled type"
                ),
            }
        }

        Ok(results)
    }

    #[instrument(skip(self), fields(server = %self.inner.name))]
    async fn lookup(&self, value: &str) -> Result<Vec<IntelContext>> {
        let request = SearchRequest {
            return_format: "json",
            attribute_type: Vec::new(),
            to_ids: Some(true),
            value: Some(value),
            include_context: Some(true),
        };

        let attributes = self.rest_search(&request).await?;

        Ok(attributes
            .into_iter()
            .map(|attr| IntelContext {
                event_id: attr.event_id,
                tags: attr.tags.into_iter().map(|t| t.name).collect(),
                confidence: attr.confidence,
                source: self.inner.name.clone(),
            })
            .collect())
    }
}

/// Builder for configuring a [`MispClient`]
pub struct MispClientBuilder {
    base_url: String,
    api_key: String,
    name: Option<String>,
    timeout: Duration,
    requests_per_second: u32,
}

impl MispClientBuilder {
    /// Create a new builder for the given server URL and API key
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            name: None,
            timeout: DEFAULT_TIMEOUT,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }

    /// Set the name used for this server in logs and context entries.
    ///
    /// Defaults to the host part of the server URL.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-second request budget
    #[must_use]
    pub const fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Build the client; fails on an unparsable server URL
    pub fn build(self) -> Result<MispClient> {
        let base_url = self.base_url.trim_end_matches('/').to_string();

        let parsed = Url::parse(&base_url)
            .map_err(|e| SocError::Config(format!("invalid server url {base_url:?}: {e}")))?;
        let name = self
            .name
            .unwrap_or_else(|| parsed.host_str().unwrap_or(&base_url).to_string());

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(concat!("dnssoc/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| SocError::Config(format!("HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN),
        );

        Ok(MispClient {
            inner: Arc::new(ClientInner {
                http,
                name,
                base_url,
                api_key: self.api_key,
                timeout: self.timeout,
                rate_limiter: RateLimiter::direct(quota),
            }),
        })
    }
}

/// Truncate an error body for log/error messages
fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

// MISP wire format
#[derive(Debug, Deserialize)]
struct RestSearchResponse {
    #[serde(default)]
    response: AttributeContainer,
}

#[derive(Debug, Default, Deserialize)]
struct AttributeContainer {
    #[serde(rename = "Attribute", default)]
    attribute: Vec<MispAttribute>,
}

#[derive(Debug, Deserialize)]
struct MispAttribute {
    #[serde(default)]
    value: String,
    #[serde(rename = "type", default)]
    attribute_type: String,
    #[serde(default)]
    event_id: String,
    #[serde(rename = "Tag", default)]
    tags: Vec<MispTag>,
    #[serde(default)]
    confidence: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct MispTag {
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    #[serde(rename = "returnFormat")]
    return_format: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    attribute_type: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_ids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(rename = "includeContext", skip_serializing_if = "Option::is_none")]
    include_context: Option<bool>,
}
