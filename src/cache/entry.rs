//! Cache Entry Module
//!
//! Defines a stored response with its write timestamp.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::models::HttpResponse;

/// Header added to every stored response; holds the write time in Unix ms.
pub const WRITTEN_AT_HEADER: &str = "x-relay-cached-at";

// == Cache Entry ==
/// One stored response, keyed by request identity.
///
/// `written_at` is fixed at construction; refreshing an entry means
/// replacing it with a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Request identity (method + URL)
    pub key: String,
    /// Response status code
    pub status: u16,
    /// Response headers, including `WRITTEN_AT_HEADER`
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
    /// Write timestamp (Unix milliseconds)
    pub written_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(key: impl Into<String>, response: HttpResponse) -> Self {
        Self::with_written_at(key, response, current_timestamp_ms())
    }

    /// Creates an entry with an explicit write time.
    pub fn with_written_at(key: impl Into<String>, response: HttpResponse, written_at: u64) -> Self {
        let mut headers: Vec<(String, String)> = response
            .headers
            .into_iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(WRITTEN_AT_HEADER))
            .collect();
        headers.push((WRITTEN_AT_HEADER.to_string(), written_at.to_string()));

        Self {
            key: key.into(),
            status: response.status,
            headers,
            body: response.body,
            written_at,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was written.
    ///
    /// The stamp header is authoritative; `written_at` covers entries whose
    /// header was lost.
    pub fn age_ms(&self) -> u64 {
        let written_at = written_at_from_headers(&self.headers).unwrap_or(self.written_at);
        current_timestamp_ms().saturating_sub(written_at)
    }

    /// True while `age < max_age`.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        u128::from(self.age_ms()) < max_age.as_millis()
    }

    /// Rebuilds the response as it should be handed back to a caller.
    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Reads the write timestamp back out of a stored response's headers.
pub fn written_at_from_headers(headers: &[(String, String)]) -> Option<u64> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(WRITTEN_AT_HEADER))
        .and_then(|(_, v)| v.parse().ok())
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
