//! Publish transports and length-based routing
//!
//! Two transports exist: a structured API call for short payloads and an
//! interactive browser-driven path for long ones. The router chooses by
//! character count. Only the structured path reports quota headers, so
//! only it runs through the rate-limit gate; the interactive path neither
//! consumes nor refreshes quota state and returns no post reference.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::limiter::{RateLimitGate, Throttled};
use crate::models::{Account, Candidate};

/// Base URL a structured post id is rendered under
pub const POST_URL_BASE: &str = "https://twitter.com/i/web/status/";

/// Render a post id as its canonical status URL
pub fn post_url(id: &str) -> String {
    format!("{POST_URL_BASE}{id}")
}

/// Reference to a published post, as written back to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef(pub String);

/// Result type for publish operations
pub type PublishResult<T> = Result<T, PublishError>;

/// Publish failures
#[derive(Debug, Error)]
pub enum PublishError {
    /// The gate declined the attempt; retried on the next due tick
    #[error(transparent)]
    Throttled(#[from] Throttled),

    /// The transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// The publish endpoint rejected the request
    #[error("publish endpoint rejected the request with status {0}")]
    Rejected(u16),

    /// Long-form payload with no interactive transport configured
    #[error("no interactive transport configured for long-form payloads")]
    InteractiveUnavailable,

    /// The candidate requires attachments but none were resolved
    #[error("candidate requires attachments but carries none")]
    AttachmentsMissing,

    /// Posting disabled by configuration
    #[error("dry run: posting disabled by configuration")]
    DryRun,

    /// HTTP-level failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Structured publish path: returns the created post's identifier
#[async_trait]
pub trait StructuredTransport: Send + Sync {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        attachments: &[String],
    ) -> PublishResult<String>;
}

/// Interactive publish path: succeeds or fails, no post identifier
#[async_trait]
pub trait InteractiveTransport: Send + Sync {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        attachments: &[String],
    ) -> PublishResult<()>;
}

/// Routes a candidate to the transport its payload length calls for
pub struct PublishRouter {
    structured: Arc<dyn StructuredTransport>,
    interactive: Option<Arc<dyn InteractiveTransport>>,

    /// Payloads at or above this many characters take the interactive path
    char_threshold: usize,
}

impl PublishRouter {
    pub fn new(
        structured: Arc<dyn StructuredTransport>,
        interactive: Option<Arc<dyn InteractiveTransport>>,
        char_threshold: usize,
    ) -> Self {
        Self {
            structured,
            interactive,
            char_threshold,
        }
    }

    /// Publish one candidate for its account.
    ///
    /// Returns the post reference on the structured path, `None` on the
    /// interactive path (it has no identifier to hand back, so the
    /// downstream post-reference write is skipped).
    pub async fn publish(
        &self,
        account: &Account,
        candidate: &Candidate,
    ) -> PublishResult<Option<PostRef>> {
        if candidate.attachments_required && candidate.attachments.is_empty() {
            return Err(PublishError::AttachmentsMissing);
        }

        if candidate.text_chars() >= self.char_threshold {
            let transport = self
                .interactive
                .as_ref()
                .ok_or(PublishError::InteractiveUnavailable)?;

            transport
                .publish(account, &candidate.text, &candidate.attachments)
                .await?;
            return Ok(None);
        }

        let id = self
            .structured
            .publish(account, &candidate.text, &candidate.attachments)
            .await?;
        Ok(Some(PostRef(post_url(&id))))
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    data: CreateData,
}

#[derive(Debug, Deserialize)]
struct CreateData {
    id: String,
}

/// Structured transport over the platform's JSON API, guarded by the gate
pub struct ApiTransport {
    client: Client,
    endpoint: Url,
    gate: Arc<RateLimitGate>,
}

impl ApiTransport {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        gate: Arc<RateLimitGate>,
    ) -> PublishResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PublishError::Transport(format!("bad endpoint {endpoint}: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            gate,
        })
    }
}

#[async_trait]
impl StructuredTransport for ApiTransport {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        attachments: &[String],
    ) -> PublishResult<String> {
        self.gate.before_request().await?;

        let mut body = serde_json::json!({ "text": text });
        if !attachments.is_empty() {
            body["media"] = serde_json::json!({ "media_ids": attachments });
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&account.credentials.bearer_token)
            .json(&body)
            .send()
            .await?;

        // Quota headers are authoritative whenever a response arrives,
        // success or not
        self.gate.after_response(response.headers()).await;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status.as_u16()));
        }

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(format!("response missing post id: {e}")))?;

        tracing::debug!(account = %account.id, post_id = %created.data.id, "structured publish ok");
        Ok(created.data.id)
    }
}

/// No-op transport for both paths; logs what would have been published
pub struct DryRunTransport;

#[async_trait]
impl StructuredTransport for DryRunTransport {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        attachments: &[String],
    ) -> PublishResult<String> {
        tracing::info!(
            account = %account.id,
            chars = text.chars().count(),
            attachments = attachments.len(),
            "dry run, structured publish suppressed"
        );
        Err(PublishError::DryRun)
    }
}

#[async_trait]
impl InteractiveTransport for DryRunTransport {
    async fn publish(
        &self,
        account: &Account,
        text: &str,
        attachments: &[String],
    ) -> PublishResult<()> {
        tracing::info!(
            account = %account.id,
            chars = text.chars().count(),
            attachments = attachments.len(),
            "dry run, interactive publish suppressed"
        );
        Err(PublishError::DryRun)
    }
}
