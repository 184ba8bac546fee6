//! Common library for the PulseGen video platform
//!
//! This crate provides shared functionality used across the PulseGen
//! services, including database connectivity and error handling.

pub mod database;
pub mod error;
