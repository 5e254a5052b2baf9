use crate::{Error, ErrorContext, Result};
use keyring::Entry;
use reqwest::Proxy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Service name used for OS keyring lookups.
pub const KEYRING_SERVICE: &str = "batch-publisher";

/// Connection tuning for the shared publish client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub tcp_keepalive_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub proxy_url: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            tcp_keepalive_secs: 30,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 10,
            proxy_url: None,
        }
    }
}

impl HttpSettings {
    /// Overlay `PUBLISH_HTTP_*` / `PUBLISH_PROXY_URL` environment values.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) but reads from `get`.
    /// Unparsable numbers are ignored.
    pub fn apply_vars<F>(mut self, get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |key: &str| get(key).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(v) = num("PUBLISH_HTTP_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = num("PUBLISH_HTTP_TIMEOUT_SECS") {
            self.request_timeout_secs = v;
        }
        if let Some(v) = num("PUBLISH_HTTP_KEEPALIVE_SECS") {
            self.tcp_keepalive_secs = v;
        }
        if let Some(v) = num("PUBLISH_HTTP_POOL_IDLE_TIMEOUT_SECS") {
            self.pool_idle_timeout_secs = v;
        }
        if let Some(v) = num("PUBLISH_HTTP_POOL_MAX_IDLE_PER_HOST") {
            self.pool_max_idle_per_host = v as usize;
        }
        if let Some(proxy) = get("PUBLISH_PROXY_URL").filter(|p| !p.trim().is_empty()) {
            self.proxy_url = Some(proxy);
        }
        self
    }

    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs.max(1)))
            .timeout(Duration::from_secs(self.request_timeout_secs.max(1)))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(self.pool_idle_timeout_secs)));

        if self.tcp_keepalive_secs > 0 {
            builder = builder.tcp_keepalive(Some(Duration::from_secs(self.tcp_keepalive_secs)));
        }

        if let Some(proxy_url) = &self.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid proxy url",
                    ErrorContext::new()
                        .with_field_path("http.proxy_url")
                        .with_details(e.to_string()),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Http(e)))
    }
}

/// Resolve a bearer credential for `profile`.
///
/// Lookup order: OS keyring (`batch-publisher` / profile), then
/// `<PROFILE>_PUBLISH_TOKEN`, then `PUBLISH_TOKEN`.
pub fn resolve_token(profile: Option<&str>) -> Option<String> {
    let profile = profile.filter(|p| !p.trim().is_empty()).unwrap_or("default");

    if let Ok(entry) = Entry::new(KEYRING_SERVICE, profile) {
        if let Ok(token) = entry.get_password() {
            return Some(token);
        }
    }

    let profile_var = format!(
        "{}_PUBLISH_TOKEN",
        profile.to_uppercase().replace(['-', '.'], "_")
    );
    env::var(profile_var)
        .ok()
        .or_else(|| env::var("PUBLISH_TOKEN").ok())
        .filter(|t| !t.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
