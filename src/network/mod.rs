//! Upstream access for the cache layer.
//!
//! Executors, lifecycle and sync only talk to upstream through [`Fetcher`],
//! so tests can swap the reqwest client for a scripted one.

mod client;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{HttpResponse, InterceptedRequest};

pub use client::HttpFetcher;

/// How an upstream call treats intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Plain request
    #[default]
    Default,
    /// Ask every upstream cache to revalidate (install precache, critical sync)
    Reload,
}

/// Performs one upstream request.
///
/// Any received response, whatever its status, is `Ok`; only transport
/// failures and timeouts are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest, mode: FetchMode) -> Result<HttpResponse>;
}
