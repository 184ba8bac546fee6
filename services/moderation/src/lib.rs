//! PulseGen moderation service
//!
//! Asynchronous content-moderation pipeline for uploaded videos: adaptive
//! frame sampling, per-frame object detection through an external
//! analyzer, verdict aggregation, and a two-axis status state machine
//! (ingest lifecycle + moderation verdict) that polling clients observe
//! through the HTTP boundary.

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod routes;
pub mod sampler;
pub mod state;
pub mod storage;
pub mod store;
