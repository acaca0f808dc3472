//! HTTP surface of the warehouse audit trail.
//!
//! Exposes the application router so both the binary and the integration
//! tests build the same service.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;
