//! Request DTOs for the cache layer
//!
//! Defines intercepted requests and incoming control/queue payloads.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// What the hosting application intends to do with a response.
///
/// Parsed from the `Sec-Fetch-Dest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    #[default]
    Other,
}

impl Destination {
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            _ => Destination::Other,
        }
    }
}

/// An outgoing request offered to the cache layer.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    /// Upper-case HTTP method
    pub method: String,
    /// Absolute target URL
    pub url: Url,
    /// Request headers, names lower-cased
    pub headers: Vec<(String, String)>,
    /// Destination hint
    pub destination: Destination,
    /// Request body, if any
    pub body: Option<Bytes>,
}

impl InterceptedRequest {
    /// Creates a plain GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn new(method: &str, url: Url) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url,
            headers: Vec::new(),
            destination: Destination::Other,
            body: None,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Store key for this request: method plus absolute URL.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Returns the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw control channel request body: `{type, data?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Control channel message kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    GetStats,
    ClearCache,
    ForceSync,
    /// Anything else; logged and left unanswered
    Unknown(String),
}

impl From<ControlRequest> for ControlMessage {
    fn from(req: ControlRequest) -> Self {
        match req.kind.as_str() {
            "GET_STATS" => ControlMessage::GetStats,
            "CLEAR_CACHE" => ControlMessage::ClearCache,
            "FORCE_SYNC" => ControlMessage::ForceSync,
            _ => ControlMessage::Unknown(req.kind),
        }
    }
}

/// Request body for POST /actions.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueActionRequest {
    /// Idempotency key, generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<String>,
}

impl EnqueueActionRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.method.trim().is_empty() {
            return Some("Method cannot be empty".to_string());
        }
        match Url::parse(&self.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => None,
            Ok(_) => Some("Only http(s) actions can be replayed".to_string()),
            Err(e) => Some(format!("Invalid url: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_request_deserialize() {
        let req: ControlRequest = serde_json::from_str(r#"{"type": "GET_STATS"}"#).unwrap();
        assert_eq!(ControlMessage::from(req), ControlMessage::GetStats);

        let req: ControlRequest =
            serde_json::from_str(r#"{"type": "FORCE_SYNC", "data": {"reason": "ui"}}"#).unwrap();
        assert!(req.data.is_some());
        assert_eq!(ControlMessage::from(req), ControlMessage::ForceSync);
    }

    #[test]
    fn test_control_request_unknown_kind() {
        let req: ControlRequest = serde_json::from_str(r#"{"type": "SKIP_WAITING"}"#).unwrap();
        assert_eq!(
            ControlMessage::from(req),
            ControlMessage::Unknown("SKIP_WAITING".to_string())
        );
    }

    #[test]
    fn test_cache_key_includes_method_and_query() {
        let url = Url::parse("https://app.test/api/items?page=2").unwrap();
        let req = InterceptedRequest::get(url);
        assert_eq!(req.cache_key(), "GET https://app.test/api/items?page=2");
    }

    #[test]
    fn test_non_http_scheme_detected() {
        let req = InterceptedRequest::get(Url::parse("chrome-extension://abc/x.js").unwrap());
        assert!(!req.is_http());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = InterceptedRequest::get(Url::parse("http://a.test/").unwrap())
            .with_header("Idempotency-Key", "abc");
        assert_eq!(req.header("idempotency-key"), Some("abc"));
    }

    #[test]
    fn test_destination_from_header() {
        assert_eq!(Destination::from_header("image"), Destination::Image);
        assert_eq!(Destination::from_header("IMAGE"), Destination::Image);
        assert_eq!(Destination::from_header("empty"), Destination::Other);
    }

    #[test]
    fn test_enqueue_validate() {
        let req = EnqueueActionRequest {
            id: None,
            method: "POST".to_string(),
            url: "ftp://x.test/a".to_string(),
            headers: vec![],
            body: None,
        };
        assert!(req.validate().is_some());

        let req = EnqueueActionRequest {
            url: "https://x.test/api/todo".to_string(),
            ..req
        };
        assert!(req.validate().is_none());
    }
}
