//! Response DTOs for the cache layer
//!
//! Defines upstream/intercepted responses and outgoing control payloads.

use bytes::Bytes;
use serde::Serialize;

/// A response as received from upstream or rebuilt from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Only 2xx responses are written to the store.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Fresh from upstream
    Network,
    /// Served from the store without touching upstream
    Cache,
    /// Served from the store after upstream failed
    StaleCache,
    /// Not eligible for caching, forwarded as-is
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::StaleCache => "stale-cache",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

/// Result of intercepting one request.
#[derive(Debug, Clone)]
pub struct InterceptedResponse {
    pub response: HttpResponse,
    pub source: ResponseSource,
}

impl InterceptedResponse {
    pub fn new(response: HttpResponse, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

/// Reply to GET_STATS and body of GET /stats.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub network_calls: u64,
    pub syncs: u64,
    pub errors: u64,
    /// Milliseconds since start or last clear
    pub uptime: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    pub namespace_version: String,
    /// Namespaces currently under the product prefix
    pub namespaces: usize,
    /// Entries held by those namespaces
    pub entries: usize,
}

/// Control channel reply: a stats snapshot or an acknowledgement.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ControlReply {
    Stats(StatsSnapshot),
    Ack { success: bool },
}

impl ControlReply {
    pub fn ack(success: bool) -> Self {
        ControlReply::Ack { success }
    }
}

/// Response body for POST /sync/:tag
#[derive(Debug, Clone, Serialize)]
pub struct SyncRegisteredResponse {
    pub registered: String,
}

/// Response body for POST /actions
#[derive(Debug, Clone, Serialize)]
pub struct QueuedResponse {
    pub queued: String,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Lifecycle phase of the cache layer
    pub lifecycle: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(lifecycle: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            lifecycle: lifecycle.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            hits: 3,
            misses: 1,
            network_calls: 2,
            syncs: 0,
            errors: 0,
            uptime: 1500,
            hit_rate: 0.75,
            namespace_version: "v1".to_string(),
            namespaces: 2,
            entries: 4,
        }
    }

    #[test]
    fn test_stats_reply_uses_camel_case() {
        let json = serde_json::to_value(ControlReply::Stats(snapshot())).unwrap();
        assert_eq!(json["networkCalls"], 2);
        assert_eq!(json["hitRate"], 0.75);
        assert_eq!(json["namespaceVersion"], "v1");
    }

    #[test]
    fn test_ack_reply_shape() {
        let json = serde_json::to_string(&ControlReply::ack(true)).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_source_serialize() {
        let json = serde_json::to_string(&ResponseSource::StaleCache).unwrap();
        assert_eq!(json, r#""stale-cache""#);
        assert_eq!(ResponseSource::StaleCache.as_str(), "stale-cache");
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy("active");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("active"));
    }
}
