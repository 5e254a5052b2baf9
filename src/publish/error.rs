//! Publish error classification

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// May succeed if the same request is sent again.
    Transient,
    /// Will fail again unchanged.
    Terminal,
}

/// Split of a batch the service answered entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFailure {
    /// Record ids the service accepted.
    pub accepted: Vec<String>,
    /// Message ids assigned to the accepted records.
    pub message_ids: Vec<String>,
    /// Record ids the service rejected.
    pub rejected: Vec<String>,
}

/// Failure of a single publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishError {
    pub kind: ErrorKind,
    /// Standard error class, e.g. "rate_limited", "invalid_request".
    pub class: String,
    pub status: Option<u16>,
    pub message: String,
    pub retry_after: Option<Duration>,
    /// Set when only some entries were rejected; the rest are already published.
    pub partial: Option<PartialFailure>,
}

impl PublishError {
    pub fn transient(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            class: class.into(),
            status: None,
            message: message.into(),
            retry_after: None,
            partial: None,
        }
    }

    pub fn terminal(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Terminal,
            class: class.into(),
            status: None,
            message: message.into(),
            retry_after: None,
            partial: None,
        }
    }

    /// Build an error from an HTTP status, classifying it.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let (class, kind) = classify_status(status);
        Self {
            kind,
            class: class.to_string(),
            status: Some(status),
            message: message.into(),
            retry_after: None,
            partial: None,
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transient("timeout", err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::transient("connection", err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::transient("server_error", err.to_string())
        } else if err.is_builder() {
            Self::terminal("invalid_request", err.to_string())
        } else {
            Self::transient("network", err.to_string())
        }
    }

    pub fn with_retry_after(mut self, after: Duration) -> Self {
        self.retry_after = Some(after);
        self
    }

    pub fn with_partial(mut self, partial: PartialFailure) -> Self {
        self.partial = Some(partial);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {} ({}): {}", status, self.class, self.message),
            None => write!(f, "{}: {}", self.class, self.message),
        }
    }
}

impl std::error::Error for PublishError {}

/// Map an HTTP status to a standard error class and its retry kind.
pub fn classify_status(status: u16) -> (&'static str, ErrorKind) {
    let class = match status {
        400 | 422 => "invalid_request",
        401 => "authentication",
        403 => "permission_denied",
        404 => "not_found",
        408 | 504 => "timeout",
        409 => "conflict",
        413 => "request_too_large",
        429 => "rate_limited",
        503 => "overloaded",
        500..=599 => "server_error",
        _ => "other",
    };
    let kind = if is_retryable_error_class(class) {
        ErrorKind::Transient
    } else {
        ErrorKind::Terminal
    };
    (class, kind)
}

/// Transient classes are worth another attempt; client errors are not.
pub fn is_retryable_error_class(error_class: &str) -> bool {
    match error_class {
        "rate_limited" | "overloaded" | "server_error" | "timeout" | "conflict" => true,
        "connection" | "network" => true,
        "invalid_request" | "authentication" | "permission_denied" | "not_found"
        | "request_too_large" | "cancelled" => false,
        _ => false,
    }
}
