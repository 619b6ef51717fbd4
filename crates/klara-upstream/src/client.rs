use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use klara_types::{truncate_chars, ChatTurn, Source};

use crate::fallback::fallback_answer;
use crate::health::HealthTracker;
use crate::traits::{AskOutcome, AskRequest, ChatBackend, ServedBy};

/// Question text sent upstream is capped to this many characters.
const MAX_QUESTION_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full endpoint URL of the upstream chat API.
    pub base_url: String,
    /// Bearer token. A placeholder value disables the upstream path.
    pub token: String,
    /// Maximum number of retrieved-context chunks requested per call.
    pub max_context_chunks: u32,
    /// How often the upstream health is re-probed.
    pub health_interval: Duration,
    /// Timeout for the minimal health probe.
    pub health_timeout: Duration,
    /// Timeout for the full chat call.
    pub call_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            max_context_chunks: 5,
            health_interval: Duration::from_secs(300),
            health_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(25),
        }
    }
}

#[derive(Serialize)]
struct UpstreamPayload<'a> {
    question: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip: Option<&'a str>,
    max_chunks: u32,
    include_sources: bool,
    conversation_history: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct UpstreamReply {
    answer: Option<String>,
    #[serde(default)]
    sources: Vec<Source>,
    #[serde(default)]
    follow_up_questions: Vec<String>,
    #[serde(default)]
    remaining_requests: Option<u32>,
}

/// HTTP adapter for the upstream chat API.
///
/// Probes upstream health at most once per configured interval and
/// degrades to [`fallback_answer`] whenever the upstream is unhealthy,
/// misconfigured, erroring or answering empty. Raw upstream failures are
/// never surfaced to callers.
pub struct HttpChatBackend {
    http: reqwest::Client,
    config: UpstreamConfig,
    health: HealthTracker,
}

impl HttpChatBackend {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let health = HealthTracker::new(config.health_interval);
        Self::with_health(config, health)
    }

    /// Construct around an externally owned health tracker, so several
    /// adapters (or a test) can share and observe the same upstream state.
    pub fn with_health(config: UpstreamConfig, health: HealthTracker) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !config.token.is_empty() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", config.token))
                    .context("Invalid upstream token format")?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            config,
            health,
        })
    }

    /// Whether URL and token are present and not placeholder values.
    fn configured(&self) -> bool {
        !is_placeholder(&self.config.base_url) && !is_placeholder(&self.config.token)
    }

    /// Minimal POST used purely to establish reachability.
    async fn probe(&self) -> bool {
        let payload = UpstreamPayload {
            question: "ping",
            user_id: "health-check",
            client_ip: None,
            max_chunks: 0,
            include_sources: false,
            conversation_history: &[],
        };
        let result = self
            .http
            .post(&self.config.base_url)
            .timeout(self.config.health_timeout)
            .json(&payload)
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Upstream health probe failed: {}", e);
                false
            }
        }
    }

    /// Full chat call. `Ok(None)` means a non-OK status.
    async fn call(&self, request: &AskRequest) -> Result<Option<UpstreamReply>> {
        let question = truncate_chars(&request.question, MAX_QUESTION_CHARS);
        let payload = UpstreamPayload {
            question: &question,
            user_id: &request.user_id,
            client_ip: request.client_ip.as_deref(),
            max_chunks: self.config.max_context_chunks,
            include_sources: true,
            conversation_history: &request.history,
        };

        let response = self
            .http
            .post(&self.config.base_url)
            .timeout(self.config.call_timeout)
            .json(&payload)
            .send()
            .await
            .context("Upstream chat call failed")?;

        if !response.status().is_success() {
            warn!("Upstream chat API returned status {}", response.status());
            return Ok(None);
        }

        let reply: UpstreamReply = response
            .json()
            .await
            .context("Upstream chat response was not valid JSON")?;
        Ok(Some(reply))
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, request: AskRequest) -> Result<AskOutcome> {
        if !self.configured() {
            debug!("Upstream chat API not configured, serving fallback");
            return Ok(fallback_answer(&request.question));
        }

        if self.health.due() {
            let healthy = self.probe().await;
            self.health.record(healthy);
        }
        if !self.health.is_healthy() {
            debug!("Upstream chat API unhealthy, serving fallback");
            return Ok(fallback_answer(&request.question));
        }

        match self.call(&request).await {
            Ok(Some(reply)) => match reply.answer.filter(|a| !a.trim().is_empty()) {
                Some(answer) => {
                    self.health.record(true);
                    Ok(AskOutcome {
                        text: answer,
                        sources: reply.sources,
                        follow_up_questions: reply.follow_up_questions,
                        remaining_requests: reply.remaining_requests.unwrap_or(0),
                        served_by: ServedBy::Upstream,
                    })
                }
                None => {
                    debug!("Upstream answered empty, serving fallback");
                    Ok(fallback_answer(&request.question))
                }
            },
            Ok(None) => {
                self.health.record(false);
                Ok(fallback_answer(&request.question))
            }
            Err(e) => {
                warn!("Upstream chat call errored: {}", e);
                self.health.record(false);
                Ok(fallback_answer(&request.question))
            }
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    lowered.is_empty()
        || lowered.contains("placeholder")
        || lowered.starts_with("your-")
        || lowered == "changeme"
}
