//! Relay Cache - An offline-first HTTP response cache
//!
//! Intercepts requests to an upstream origin, answers them with a per-class
//! caching strategy and keeps critical data fresh in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod network;
pub mod strategy;
pub mod sync;
pub mod tasks;
pub mod worker;

pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use network::{FetchMode, Fetcher, HttpFetcher};
pub use tasks::{spawn_cleanup_task, spawn_connectivity_monitor};
pub use worker::{CacheWorker, WorkerEvents};
