//! Maps a request path and destination hint to exactly one classification.

use std::fmt;

use crate::models::Destination;

/// Path prefixes of configuration and authentication endpoints.
pub const CRITICAL_PREFIXES: [&str; 2] = ["/api/config", "/api/auth"];

/// Path prefix of every other API endpoint.
pub const API_PREFIX: &str = "/api";

/// Path segments that mark image or asset requests.
const IMAGE_SEGMENTS: [&str; 2] = ["assets", "images"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Static,
    Api,
    Critical,
    Images,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Static => "static",
            Classification::Api => "api",
            Classification::Critical => "critical",
            Classification::Images => "images",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered decision chain; the first matching rule wins:
///
/// 1. under a critical prefix → `Critical`
/// 2. under the API prefix → `Api`
/// 3. exact or suffix match against the static manifest → `Static`
/// 4. image destination or an `assets`/`images` path segment → `Images`
/// 5. anything else → `Api`
#[derive(Debug, Clone)]
pub struct Classifier {
    manifest: Vec<String>,
}

impl Classifier {
    pub fn new(manifest: Vec<String>) -> Self {
        Self { manifest }
    }

    pub fn classify(&self, path: &str, destination: Destination) -> Classification {
        if CRITICAL_PREFIXES.iter().any(|p| is_under(path, p)) {
            return Classification::Critical;
        }
        if is_under(path, API_PREFIX) {
            return Classification::Api;
        }
        if self.in_manifest(path) {
            return Classification::Static;
        }
        if destination == Destination::Image
            || path.split('/').any(|seg| IMAGE_SEGMENTS.contains(&seg))
        {
            return Classification::Images;
        }
        Classification::Api
    }

    fn in_manifest(&self, path: &str) -> bool {
        self.manifest.iter().any(|asset| {
            // "/" only ever matches exactly, otherwise it would suffix-match everything
            path == asset || (asset.len() > 1 && path.ends_with(asset.as_str()))
        })
    }
}

/// True when `path` equals `prefix` or continues it with a new segment.
fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
