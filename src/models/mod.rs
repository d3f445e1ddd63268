//! Request and Response models for the cache layer
//!
//! This module defines the DTOs used on the interception surface, the
//! control channel and the daemon's HTTP endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ControlMessage, ControlRequest, Destination, EnqueueActionRequest, InterceptedRequest};
pub use responses::{
    ControlReply, HealthResponse, HttpResponse, InterceptedResponse, QueuedResponse,
    ResponseSource, StatsSnapshot, SyncRegisteredResponse,
};
