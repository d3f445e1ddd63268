//! Scripted fetcher for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchMode, Fetcher};
use crate::error::{CacheError, Result};
use crate::models::{HttpResponse, InterceptedRequest};

#[derive(Debug, Clone)]
enum Outcome {
    Respond(u16, String),
    Fail,
}

#[derive(Debug, Clone)]
struct Route {
    delay: Duration,
    outcome: Outcome,
}

/// Answers by URL from a mutable script; unknown URLs fail like a dead network.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    log: Mutex<Vec<(String, String, FetchMode)>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_after(url, Duration::ZERO, status, body);
    }

    pub(crate) fn respond_after(&self, url: &str, delay: Duration, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                delay,
                outcome: Outcome::Respond(status, body.to_string()),
            },
        );
    }

    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                delay: Duration::ZERO,
                outcome: Outcome::Fail,
            },
        );
    }

    pub(crate) fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u, _)| u == url)
            .count()
    }

    pub(crate) fn modes_for(&self, url: &str) -> Vec<FetchMode> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u, _)| u == url)
            .map(|(_, _, m)| *m)
            .collect()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _, _)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &InterceptedRequest, mode: FetchMode) -> Result<HttpResponse> {
        let url = request.url.to_string();
        self.log
            .lock()
            .unwrap()
            .push((request.method.clone(), url.clone(), mode));

        let route = self.routes.lock().unwrap().get(&url).cloned();
        let Some(route) = route else {
            return Err(CacheError::Network(format!("no route to {}", url)));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        match route.outcome {
            Outcome::Respond(status, body) => Ok(HttpResponse::new(status, body)),
            Outcome::Fail => Err(CacheError::Network(format!("connection refused: {}", url))),
        }
    }
}
