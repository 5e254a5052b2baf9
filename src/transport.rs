//! HTTP transport construction.
//!
//! Connection tuning lives here so the publisher only deals with requests.

pub mod http;

pub use http::{resolve_token, HttpSettings, TransportError};
