use super::{PartialFailure, PublishError, PublishReceipt, Publisher};
use crate::batch::Batch;
use crate::config::PublisherConfig;
use crate::transport::resolve_token;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishBatchRequest<'a> {
    pub topic_arn: &'a str,
    pub publish_batch_request_entries: Vec<PublishEntry<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishEntry<'a> {
    pub id: &'a str,
    pub message: &'a str,
}

impl<'a> PublishBatchRequest<'a> {
    pub fn from_batch(topic_arn: &'a str, batch: &'a Batch) -> Self {
        Self {
            topic_arn,
            publish_batch_request_entries: batch
                .records
                .iter()
                .map(|r| PublishEntry {
                    id: &r.id,
                    message: &r.payload,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PublishBatchResponse {
    pub successful: Vec<SuccessfulEntry>,
    pub failed: Vec<FailedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SuccessfulEntry {
    pub id: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailedEntry {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub sender_fault: bool,
}

/// Publishes batches as JSON `PublishBatch` requests to a gateway endpoint.
///
/// Requests are not SigV4-signed; the endpoint must be a gateway that accepts
/// bearer credentials and forwards to the pub/sub service.
/// The underlying `reqwest::Client` pools connections and is cheap to share.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: Url,
    topic: String,
    region: Option<String>,
    token: Option<String>,
}

impl HttpPublisher {
    pub fn new(client: reqwest::Client, endpoint: Url, topic: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            topic: topic.into(),
            region: None,
            token: None,
        }
    }

    /// Build the shared client and resolve credentials from a validated config.
    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        let endpoint = config.publish_endpoint()?;
        let client = config.http.build_client()?;
        let mut publisher = Self::new(client, endpoint, config.topic.clone());
        publisher.region = config.region.clone();
        publisher.token = resolve_token(config.profile.as_deref());
        Ok(publisher)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Region forwarded to the gateway in `x-publish-region`.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
        parse_retry_after(value.trim(), Utc::now())
    }

    fn receipt_from(
        batch: &Batch,
        body: &[u8],
    ) -> std::result::Result<PublishReceipt, PublishError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(PublishReceipt::default());
        }
        let resp: PublishBatchResponse = serde_json::from_slice(body).map_err(|e| {
            PublishError::terminal(
                "invalid_response",
                format!("batch {}: undecodable response: {}", batch.index, e),
            )
        })?;

        if !resp.failed.is_empty() {
            let sender_fault = resp.failed.iter().any(|f| f.sender_fault);
            let first = &resp.failed[0];
            let msg = format!(
                "{} of {} entries rejected (first: {} {}: {})",
                resp.failed.len(),
                batch.len(),
                first.id,
                first.code.as_deref().unwrap_or("unknown"),
                first.message.as_deref().unwrap_or(""),
            );
            let err = if sender_fault {
                PublishError::terminal("invalid_request", msg)
            } else {
                PublishError::transient("server_error", msg)
            };
            let partial = PartialFailure {
                accepted: resp.successful.iter().map(|s| s.id.clone()).collect(),
                message_ids: resp
                    .successful
                    .into_iter()
                    .filter_map(|s| s.message_id)
                    .collect(),
                rejected: resp.failed.iter().map(|f| f.id.clone()).collect(),
            };
            return Err(err.with_partial(partial));
        }

        Ok(PublishReceipt {
            message_ids: resp
                .successful
                .into_iter()
                .filter_map(|s| s.message_id)
                .collect(),
        })
    }
}

/// `Retry-After` carries either delay-seconds or an HTTP date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish_batch(
        &self,
        batch: &Batch,
    ) -> std::result::Result<PublishReceipt, PublishError> {
        let body = PublishBatchRequest::from_batch(&self.topic, batch);
        let request_id = Uuid::new_v4().to_string();

        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("x-batch-publisher-request-id", &request_id)
            .json(&body);
        if let Some(region) = &self.region {
            req = req.header("x-publish-region", region);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        debug!(batch = batch.index, entries = batch.len(), %request_id, "sending publish request");

        let resp = req.send().await.map_err(|e| PublishError::from_reqwest(&e))?;
        let status = resp.status();
        let retry_after = Self::retry_after(resp.headers());
        let bytes = resp.bytes().await.map_err(|e| PublishError::from_reqwest(&e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let text: String = text.chars().take(MAX_ERROR_BODY).collect();
            let mut err = PublishError::from_status(status.as_u16(), text);
            if let Some(after) = retry_after {
                err = err.with_retry_after(after);
            }
            return Err(err);
        }

        Self::receipt_from(batch, &bytes)
    }
}
