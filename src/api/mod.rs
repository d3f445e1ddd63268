//! API Module
//!
//! HTTP handlers and routing for the cache layer.
//!
//! # Endpoints
//! - `ANY /proxy/*path` - Intercepted request to the upstream origin
//! - `POST /control` - Control channel message
//! - `GET /stats` - Stats snapshot
//! - `POST /sync/:tag` - Register a background sync
//! - `POST /actions` - Queue a user action for replay
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
