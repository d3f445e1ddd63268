//! Configuration Module
//!
//! Handles loading and managing cache daemon configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Daemon configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix shared by every namespace this daemon owns
    pub product: String,
    /// Version tag baked into current namespace names
    pub version: String,
    /// HTTP server port
    pub server_port: u16,
    /// Origin that proxied paths are resolved against
    pub upstream_url: String,
    /// Paths precached on install and classified as static
    pub static_manifest: Vec<String>,
    /// Paths refreshed by the critical-data sync
    pub critical_endpoints: Vec<String>,
    /// Eviction sweep interval in seconds
    pub cleanup_interval: u64,
    /// Upstream reachability probe interval in seconds
    pub connectivity_interval: u64,
    /// Maximum number of in-flight background refreshes
    pub revalidate_concurrency: usize,
    /// Hard ceiling on any upstream call, in seconds
    pub request_timeout: u64,
    /// JSON file backing the replay queue, in-memory when None
    pub action_queue_path: Option<PathBuf>,
    /// Failed replays tolerated before an action is dropped
    pub replay_max_attempts: u32,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PRODUCT_NAME` - Namespace prefix (default: relay)
    /// - `CACHE_VERSION` - Namespace version (default: v1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Origin base URL (default: http://127.0.0.1:8080)
    /// - `STATIC_MANIFEST` - Comma separated precache paths
    /// - `CRITICAL_ENDPOINTS` - Comma separated critical paths
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 21600)
    /// - `CONNECTIVITY_INTERVAL` - Probe frequency in seconds (default: 30)
    /// - `REVALIDATE_CONCURRENCY` - Background refresh pool size (default: 8)
    /// - `REQUEST_TIMEOUT` - Upstream call ceiling in seconds (default: 30)
    /// - `ACTION_QUEUE_PATH` - Replay queue file (default: in-memory)
    /// - `REPLAY_MAX_ATTEMPTS` - Replay ceiling per action (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            product: env::var("PRODUCT_NAME").unwrap_or(defaults.product),
            version: env::var("CACHE_VERSION").unwrap_or(defaults.version),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            static_manifest: list_env("STATIC_MANIFEST").unwrap_or(defaults.static_manifest),
            critical_endpoints: list_env("CRITICAL_ENDPOINTS")
                .unwrap_or(defaults.critical_endpoints),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            connectivity_interval: parse_env("CONNECTIVITY_INTERVAL")
                .unwrap_or(defaults.connectivity_interval),
            revalidate_concurrency: parse_env("REVALIDATE_CONCURRENCY")
                .unwrap_or(defaults.revalidate_concurrency),
            request_timeout: parse_env("REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout),
            action_queue_path: env::var("ACTION_QUEUE_PATH").ok().map(PathBuf::from),
            replay_max_attempts: parse_env("REPLAY_MAX_ATTEMPTS")
                .unwrap_or(defaults.replay_max_attempts),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product: "relay".to_string(),
            version: "v1".to_string(),
            server_port: 3000,
            upstream_url: "http://127.0.0.1:8080".to_string(),
            static_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
            ],
            critical_endpoints: vec!["/api/config".to_string(), "/api/auth/session".to_string()],
            cleanup_interval: 6 * 60 * 60,
            connectivity_interval: 30,
            revalidate_concurrency: 8,
            request_timeout: 30,
            action_queue_path: None,
            replay_max_attempts: 5,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn list_env(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}
