//! Configuration management for termrank.
//!
//! Values come from command-line arguments, falling back to
//! `TERMRANK_*` environment variables (see `main.rs`).

mod settings;

pub use settings::{Config, DEFAULT_MAX_RESULTS, DEFAULT_PERIOD_SECS, DEFAULT_SEPARATOR};
