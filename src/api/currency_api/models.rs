use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of the `currencies.json` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
}

/// Errors surfaced by the currency API client.
///
/// Every failure of a single GET maps to exactly one variant; the client never
/// retries and never panics on a bad response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure before a response arrived
    #[error("Request failed: {0}")]
    Transport(String),
    /// The server answered with a non-success status code
    #[error("HTTP error {status} for {url}")]
    Status { status: u16, url: String },
    /// Success status but nothing in the body
    #[error("Empty response from {0}")]
    EmptyBody(String),
    /// Body was not valid UTF-8 JSON
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
    /// Valid JSON, but not the shape the endpoint documents
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}
