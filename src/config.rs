//! Publisher configuration.
//!
//! A [`PublisherConfig`] is assembled once at startup and then handed to the
//! core by value. Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. process environment (the binary loads `.env` first)
//! 4. command-line flags (applied by the binary)
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SNS_TOPIC` | `topic` |
//! | `AWS_REGION` | `region` |
//! | `AWS_PROFILE` | `profile` |
//! | `PUBLISH_ENDPOINT` | `endpoint` |
//! | `MESSAGE_COUNT` | `message_count` |
//! | `PAYLOAD` | `payload` |
//! | `BATCH_SIZE` | `batch.max_batch_size` |
//! | `REMAINDER_POLICY` | `batch.remainder` |
//! | `MAX_INFLIGHT` | `dispatch.max_inflight` |
//! | `FAILURE_MODE` | `dispatch.failure_mode` |
//! | `MAX_RETRIES` | `dispatch.retry.max_retries` |
//! | `PUBLISH_HTTP_*`, `PUBLISH_PROXY_URL` | `http` |

use crate::batch::BatchConfig;
use crate::dispatch::DispatcherConfig;
use crate::message::DEFAULT_PAYLOAD;
use crate::transport::HttpSettings;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_MESSAGE_COUNT: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Topic identifier (ARN or name) every batch is published to.
    pub topic: String,
    /// Forwarded to the gateway with every request.
    pub region: Option<String>,
    /// Credential profile used for token lookup.
    pub profile: Option<String>,
    /// URL of the PublishBatch gateway. Required unless publishing is a dry run.
    pub endpoint: Option<String>,
    pub message_count: usize,
    pub payload: String,
    pub batch: BatchConfig,
    pub dispatch: DispatcherConfig,
    pub http: HttpSettings,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            region: None,
            profile: None,
            endpoint: None,
            message_count: DEFAULT_MESSAGE_COUNT,
            payload: DEFAULT_PAYLOAD.to_string(),
            batch: BatchConfig::default(),
            dispatch: DispatcherConfig::default(),
            http: HttpSettings::default(),
        }
    }
}

impl PublisherConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Defaults, then `path` (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        base.apply_env()
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file: {}", e),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from `get`, which maps a variable name to its value.
    pub fn apply_vars<F>(mut self, get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SNS_TOPIC") {
            self.topic = v;
        }
        if let Some(v) = get("AWS_REGION") {
            self.region = Some(v);
        }
        if let Some(v) = get("AWS_PROFILE") {
            self.profile = Some(v);
        }
        if let Some(v) = get("PUBLISH_ENDPOINT") {
            self.endpoint = Some(v);
        }
        if let Some(v) = get("PAYLOAD") {
            self.payload = v;
        }
        if let Some(v) = parse_var(&get, "MESSAGE_COUNT")? {
            self.message_count = v;
        }
        if let Some(v) = parse_var(&get, "BATCH_SIZE")? {
            self.batch.max_batch_size = v;
        }
        if let Some(v) = parse_var(&get, "REMAINDER_POLICY")? {
            self.batch.remainder = v;
        }
        if let Some(v) = parse_var(&get, "MAX_INFLIGHT")? {
            self.dispatch.max_inflight = v;
        }
        if let Some(v) = parse_var(&get, "FAILURE_MODE")? {
            self.dispatch.failure_mode = v;
        }
        if let Some(v) = parse_var(&get, "MAX_RETRIES")? {
            self.dispatch.retry.max_retries = v;
        }
        self.http = self.http.apply_vars(get);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "topic is not set",
                ErrorContext::new()
                    .with_field_path("topic")
                    .with_details("set SNS_TOPIC or --topic")
                    .with_source("publisher_config"),
            ));
        }
        self.batch.validate()?;
        self.dispatch.validate()?;
        self.endpoint_url()?;
        Ok(())
    }

    /// The configured publish URL, if any.
    pub fn endpoint_url(&self) -> Result<Option<Url>> {
        let Some(raw) = &self.endpoint else {
            return Ok(None);
        };
        Url::parse(raw.trim()).map(Some).map_err(|e| {
            Error::configuration_with_context(
                "invalid publish endpoint",
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details(format!("{}: {}", raw, e))
                    .with_source("publisher_config"),
            )
        })
    }

    /// The publish URL, failing when none is configured.
    pub fn publish_endpoint(&self) -> Result<Url> {
        self.endpoint_url()?.ok_or_else(|| {
            Error::configuration_with_context(
                "no publish endpoint configured",
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details("set PUBLISH_ENDPOINT or --endpoint to a PublishBatch gateway")
                    .with_source("publisher_config"),
            )
        })
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot parse {}", key),
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(format!("'{}': {}", raw, e))
                    .with_source("config_loader"),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RemainderPolicy;
    use crate::dispatch::FailureMode;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = PublisherConfig::default();
        assert_eq!(c.message_count, 100_000);
        assert_eq!(c.payload, "Hello world");
        assert_eq!(c.batch.max_batch_size, 10);
        assert_eq!(c.dispatch.max_inflight, 500);
        assert!(c.validate().is_err(), "empty topic must not validate");
    }

    #[test]
    fn test_env_overlay() {
        let c = PublisherConfig::default()
            .apply_vars(vars(&[
                ("SNS_TOPIC", "arn:aws:sns:eu-west-1:123:demo"),
                ("AWS_REGION", "eu-west-1"),
                ("AWS_PROFILE", "loadtest"),
                ("MESSAGE_COUNT", "25"),
                ("BATCH_SIZE", "5"),
                ("REMAINDER_POLICY", "drop"),
                ("MAX_INFLIGHT", "8"),
                ("FAILURE_MODE", "cancel"),
                ("MAX_RETRIES", "2"),
                ("PUBLISH_HTTP_TIMEOUT_SECS", "7"),
            ]))
            .unwrap();
        assert_eq!(c.topic, "arn:aws:sns:eu-west-1:123:demo");
        assert_eq!(c.profile.as_deref(), Some("loadtest"));
        assert_eq!(c.message_count, 25);
        assert_eq!(c.batch.max_batch_size, 5);
        assert_eq!(c.batch.remainder, RemainderPolicy::Drop);
        assert_eq!(c.dispatch.max_inflight, 8);
        assert_eq!(c.dispatch.failure_mode, FailureMode::CancelRemaining);
        assert_eq!(c.dispatch.retry.max_retries, 2);
        assert_eq!(c.http.request_timeout_secs, 7);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let err = PublisherConfig::default()
            .apply_vars(vars(&[("MAX_INFLIGHT", "lots")]))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("MAX_INFLIGHT")
        );
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let c = PublisherConfig::new("t")
            .apply_vars(vars(&[("SNS_TOPIC", "  "), ("BATCH_SIZE", "")]))
            .unwrap();
        assert_eq!(c.topic, "t");
        assert_eq!(c.batch.max_batch_size, 10);
    }

    #[test]
    fn test_yaml_file_shape() {
        let c = PublisherConfig::from_yaml_str(
            r#"
topic: orders
endpoint: http://localhost:4566/
message_count: 30
batch:
  max_batch_size: 10
  remainder: drop
dispatch:
  max_inflight: 4
  failure_mode: cancelremaining
  retry:
    max_retries: 1
http:
  connect_timeout_secs: 1
"#,
        )
        .unwrap();
        assert_eq!(c.topic, "orders");
        assert_eq!(c.message_count, 30);
        assert_eq!(c.batch.remainder, RemainderPolicy::Drop);
        assert_eq!(c.dispatch.max_inflight, 4);
        assert_eq!(c.dispatch.failure_mode, FailureMode::CancelRemaining);
        assert_eq!(c.dispatch.retry.max_retries, 1);
        assert_eq!(c.dispatch.retry.max_delay_ms, 5_000);
        assert_eq!(c.http.connect_timeout_secs, 1);
        assert_eq!(c.http.pool_idle_timeout_secs, 90);
        assert_eq!(c.payload, "Hello world");
    }

    #[test]
    fn test_endpoint_resolution() {
        let mut c = PublisherConfig::new("t");
        assert_eq!(c.endpoint_url().unwrap(), None);

        c.region = Some("us-east-2".to_string());
        assert_eq!(c.endpoint_url().unwrap(), None);
        let err = c.publish_endpoint().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.context().and_then(|ctx| ctx.field_path.as_deref()),
            Some("endpoint")
        );

        c.endpoint = Some("http://127.0.0.1:9000/publish".to_string());
        assert_eq!(
            c.endpoint_url().unwrap().unwrap().as_str(),
            "http://127.0.0.1:9000/publish"
        );

        c.endpoint = Some("not a url".to_string());
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validation_covers_nested_configs() {
        let mut c = PublisherConfig::new("t");
        c.batch.max_batch_size = 11;
        assert!(c.validate().is_err());

        let mut c = PublisherConfig::new("t");
        c.dispatch.max_inflight = 0;
        assert!(c.validate().is_err());
    }
}
