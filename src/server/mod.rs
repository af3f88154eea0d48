//! Ranking server.
//!
//! This module provides:
//! - The server that ties watcher, index and ranking together
//! - Report sinks
//! - Tracing setup

mod app;
mod observability;
mod sink;

pub use app::{ServerConfig, TfIdfServer};
pub use observability::{init_tracing, TracingConfig};
pub use sink::ReportSink;
